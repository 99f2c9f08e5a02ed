use crate::bdmv::error::{BdmvError, BdmvResult};
use crate::bdmv::reader::BinaryReader;
use log::warn;

const MAGIC: &str = "INDX";

const OBJECT_TYPE_HDMV: u8 = 0x01;
const OBJECT_TYPE_BDJ: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleObjectType {
    Hdmv,
    Bdj,
}

/// One title entry from the Indexes table.
#[derive(Debug, Clone)]
pub struct TitleEntry {
    pub title_number: u16,
    pub object_type: TitleObjectType,
    /// MovieObject index for HDMV titles, 0 for BD-J.
    pub movie_object_id: u16,
    pub access_type: u8,
}

/// Parsed contents of an `index.bdmv` file.
#[derive(Debug, Clone, Default)]
pub struct IndexBdmv {
    pub first_playback_object: Option<u16>,
    pub top_menu_object: Option<u16>,
    pub titles: Vec<TitleEntry>,
}

/// Parse an `index.bdmv` buffer.
pub fn parse_index(data: &[u8]) -> BdmvResult<IndexBdmv> {
    let mut r = BinaryReader::new(data);

    let magic = r.read_string(4)?;
    if magic != MAGIC {
        return Err(BdmvError::MagicMismatch {
            expected: MAGIC,
            got: magic,
        });
    }
    let version = r.read_string(4)?;
    if version != "0100" && version != "0200" && version != "0300" {
        return Err(BdmvError::UnsupportedVersion { got: version });
    }

    let indexes_start = r.u32()? as usize;
    let _ext_data_start = r.u32()?;

    r.seek(indexes_start)?;
    let _section_length = r.u32()?;

    let first_playback_object = parse_index_entry(&mut r)?.map(|(_, id, _)| id);
    let top_menu_object = parse_index_entry(&mut r)?.map(|(_, id, _)| id);

    let num_titles = r.u16()?;
    let mut titles = Vec::with_capacity(num_titles as usize);
    for title_number in 0..num_titles {
        match parse_index_entry(&mut r) {
            Ok(Some((object_type, movie_object_id, access_type))) => {
                titles.push(TitleEntry {
                    title_number,
                    object_type,
                    movie_object_id,
                    access_type,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!("index.bdmv: title entry {title_number} unreadable: {e}");
                break;
            }
        }
    }

    Ok(IndexBdmv {
        first_playback_object,
        top_menu_object,
        titles,
    })
}

/// Parse a 12-byte index entry; `None` when no object is present.
fn parse_index_entry(
    r: &mut BinaryReader<'_>,
) -> BdmvResult<Option<(TitleObjectType, u16, u8)>> {
    let flags = r.u8()?;
    let object_type_bits = (flags >> 6) & 0x03;
    let access_type = (flags >> 2) & 0x0F;
    r.skip(3)?; // remaining flag / reserved bytes

    match object_type_bits {
        OBJECT_TYPE_HDMV => {
            r.skip(2)?; // hdmv_playback_type
            let movie_object_id = r.u16()?;
            r.skip(4)?; // reserved
            Ok(Some((TitleObjectType::Hdmv, movie_object_id, access_type)))
        }
        OBJECT_TYPE_BDJ => {
            r.skip(5)?; // BD-J object name
            r.skip(3)?; // padding
            Ok(Some((TitleObjectType::Bdj, 0, access_type)))
        }
        _ => {
            r.skip(8)?;
            Ok(None)
        }
    }
}
