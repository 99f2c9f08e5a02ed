use crate::bdmv::error::{BdmvError, BdmvResult};
use crate::bdmv::models::{ClipInfo, StreamInfo};
use crate::bdmv::mpls::parse_stream_attrs;
use crate::bdmv::reader::BinaryReader;

const MAGIC: &str = "HDMV";

/// Parse one `*.clpi` buffer into a [`ClipInfo`].
///
/// Only the ProgramInfo section is read; the attribute blocks share their
/// layout with the MPLS stream number table.
pub fn parse_clpi(data: &[u8], clip_id: &str) -> BdmvResult<ClipInfo> {
    let mut r = BinaryReader::new(data);

    let magic = r.read_string(4)?;
    if magic != MAGIC {
        return Err(BdmvError::MagicMismatch {
            expected: MAGIC,
            got: magic,
        });
    }
    let _version = r.read_string(4)?;

    let _sequence_info_start = r.u32()?;
    let program_info_start = r.u32()? as usize;
    let _cpi_start = r.u32()?;
    let _clip_mark_start = r.u32()?;
    let _ext_data_start = r.u32()?;

    r.seek(program_info_start)?;
    let streams = parse_program_info(&mut r)?;

    Ok(ClipInfo {
        clip_id: clip_id.to_string(),
        streams,
    })
}

fn parse_program_info(r: &mut BinaryReader<'_>) -> BdmvResult<Vec<StreamInfo>> {
    let length = r.u32()? as usize;
    if length == 0 {
        return Ok(Vec::new());
    }
    if length > r.remaining() {
        return Err(BdmvError::LengthOverflow {
            section: "ProgramInfo",
            declared: length,
            remaining: r.remaining(),
        });
    }

    r.skip(1)?; // reserved
    let num_programs = r.u8()?;

    let mut streams = Vec::new();
    for _ in 0..num_programs {
        r.skip(4)?; // SPN_program_sequence_start
        r.skip(2)?; // program_map_PID
        let num_streams = r.u8()?;
        r.skip(1)?; // num_groups
        for _ in 0..num_streams {
            let pid = r.u16()?;
            let (coding_type, codec, lang) = parse_stream_attrs(r)?;
            streams.push(StreamInfo {
                pid,
                coding_type,
                codec,
                lang,
            });
        }
    }
    Ok(streams)
}
