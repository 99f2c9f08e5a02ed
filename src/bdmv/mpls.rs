use crate::bdmv::error::{BdmvError, BdmvResult};
use crate::bdmv::models::{
    ChapterMark, Codec, PlayItem, Playlist, SegmentLabel, StreamInfo, Warning, WarningCode,
};
use crate::bdmv::reader::BinaryReader;
use log::warn;

const MAGIC: &str = "MPLS";

/// Parse one `*.mpls` buffer into a [`Playlist`].
///
/// Malformed play items and stream tables are skipped via their declared
/// lengths and reported through `warnings`; a corrupt section header or a
/// missing magic fails the whole file.
pub fn parse_mpls(data: &[u8], name: &str, warnings: &mut Vec<Warning>) -> BdmvResult<Playlist> {
    let mut r = BinaryReader::new(data);

    let magic = r.read_string(4)?;
    if magic != MAGIC {
        return Err(BdmvError::MagicMismatch {
            expected: MAGIC,
            got: magic,
        });
    }
    let version = r.read_string(4)?;

    let playlist_start = r.u32()? as usize;
    let mark_start = r.u32()? as usize;
    let _ext_start = r.u32()?;

    r.seek(playlist_start)?;
    let (play_items, is_multi_angle) = parse_play_list(&mut r, name, warnings)?;

    // Chapter marks are optional: a playlist without them is still usable.
    let chapters = if mark_start == 0 {
        Vec::new()
    } else {
        match r.seek(mark_start).and_then(|_| parse_marks(&mut r)) {
            Ok(marks) => marks,
            Err(e) => {
                warn!("{name}: failed to parse PlayListMark section: {e}");
                warnings.push(
                    Warning::new(
                        WarningCode::MalformedSection,
                        format!("PlayListMark section unreadable: {e}"),
                    )
                    .with_context("file", name),
                );
                Vec::new()
            }
        }
    };

    Ok(Playlist {
        mpls: name.to_string(),
        version,
        play_items,
        chapters,
        is_multi_angle,
    })
}

fn parse_play_list(
    r: &mut BinaryReader<'_>,
    name: &str,
    warnings: &mut Vec<Warning>,
) -> BdmvResult<(Vec<PlayItem>, bool)> {
    let section_len = r.u32()? as usize;
    if section_len > r.remaining() {
        return Err(BdmvError::LengthOverflow {
            section: "PlayList",
            declared: section_len,
            remaining: r.remaining(),
        });
    }
    r.skip(2)?; // reserved
    let num_items = r.u16()?;
    let _num_sub_paths = r.u16()?;

    let mut items = Vec::with_capacity(num_items as usize);
    let mut is_multi_angle = false;
    for idx in 0..num_items {
        let item_len = match r.u16() {
            Ok(len) => len as usize,
            Err(e) => {
                warn!("{name}: PlayItem {idx} length prefix unreadable: {e}");
                warnings.push(
                    Warning::new(
                        WarningCode::MalformedSection,
                        format!("PlayItem {idx} length prefix unreadable"),
                    )
                    .with_context("file", name),
                );
                break;
            }
        };
        let body_start = r.tell();
        let sub = match r.slice(body_start, item_len) {
            Ok(sub) => sub,
            Err(_) => {
                warnings.push(
                    Warning::new(
                        WarningCode::MalformedSection,
                        format!("PlayItem {idx} declares {item_len} byte(s) past end of file"),
                    )
                    .with_context("file", name),
                );
                break;
            }
        };
        match parse_play_item(sub) {
            Ok((item, multi_angle)) => {
                is_multi_angle |= multi_angle;
                items.push(item);
            }
            Err(e) => {
                warn!("{name}: skipping PlayItem {idx}: {e}");
                warnings.push(
                    Warning::new(
                        WarningCode::MalformedSection,
                        format!("PlayItem {idx} skipped: {e}"),
                    )
                    .with_context("file", name)
                    .with_context("offset", body_start.to_string()),
                );
            }
        }
        r.seek(body_start + item_len)?;
    }

    Ok((items, is_multi_angle))
}

fn parse_play_item(mut r: BinaryReader<'_>) -> BdmvResult<(PlayItem, bool)> {
    let clip_id = r.read_string(5)?;
    let _codec_id = r.read_string(4)?;

    let flags = r.u16()?;
    let is_multi_angle = (flags >> 4) & 1 == 1;
    let connection_condition = (flags & 0x0F) as u8;

    r.skip(1)?; // ref_to_STC_id
    let in_time = r.u32()?;
    let out_time = r.u32()?;
    r.skip(8)?; // UO_mask_table
    r.skip(1)?; // random access flag + reserved
    let _still_mode = r.u8()?;
    r.skip(2)?; // still_time or reserved

    if is_multi_angle {
        let angle_count = r.u8()?;
        r.skip(1)?; // angle flags
        r.skip(angle_count.saturating_sub(1) as usize * 10)?;
    }

    let streams = parse_stn_table(&mut r)?;

    let m2ts = format!("{clip_id}.m2ts");
    Ok((
        PlayItem {
            clip_id,
            m2ts,
            in_time,
            out_time,
            connection_condition,
            streams,
            label: SegmentLabel::Unknown,
        },
        is_multi_angle,
    ))
}

fn parse_stn_table(r: &mut BinaryReader<'_>) -> BdmvResult<Vec<StreamInfo>> {
    let stn_len = r.u16()? as usize;
    if stn_len == 0 {
        return Ok(Vec::new());
    }
    let mut stn = r.slice(r.tell(), stn_len)?;

    stn.skip(2)?; // reserved
    let num_video = stn.u8()?;
    let num_audio = stn.u8()?;
    let num_pg = stn.u8()?;
    let num_ig = stn.u8()?;
    let num_secondary_audio = stn.u8()?;
    let num_secondary_video = stn.u8()?;
    let num_pip_pg = stn.u8()?;
    stn.skip(5)?; // reserved

    let total = num_video as usize
        + num_audio as usize
        + num_pg as usize
        + num_ig as usize
        + num_secondary_audio as usize
        + num_secondary_video as usize
        + num_pip_pg as usize;

    let mut streams = Vec::with_capacity(total);
    for _ in 0..total {
        let pid = parse_stream_entry(&mut stn)?;
        let (coding_type, codec, lang) = parse_stream_attrs(&mut stn)?;
        streams.push(StreamInfo {
            pid,
            coding_type,
            codec,
            lang,
        });
    }
    Ok(streams)
}

/// Stream entry: the PID location depends on the entry type.
fn parse_stream_entry(r: &mut BinaryReader<'_>) -> BdmvResult<u16> {
    let entry_len = r.u8()? as usize;
    let entry_start = r.tell();
    let stream_type = r.u8()?;
    let pid = match stream_type {
        0x01 | 0x02 => r.u16()?,
        0x03 | 0x04 => {
            r.skip(1)?; // ref_to_sub_path_id
            r.u16()?
        }
        _ => 0,
    };
    r.seek(entry_start + entry_len)?;
    Ok(pid)
}

pub(crate) fn parse_stream_attrs(r: &mut BinaryReader<'_>) -> BdmvResult<(u8, Codec, String)> {
    let attr_len = r.u8()? as usize;
    let attr_start = r.tell();
    let coding_type = r.u8()?;
    let codec = Codec::from_coding_type(coding_type);

    let lang = if codec.is_audio() {
        r.skip(1)?; // audio format + sample rate
        r.read_string(3)?
    } else if codec.is_graphics() {
        if matches!(codec, Codec::TextSubtitle) {
            r.skip(1)?; // character code
        }
        r.read_string(3)?
    } else {
        String::new()
    };

    r.seek(attr_start + attr_len)?;
    Ok((coding_type, codec, lang))
}

fn parse_marks(r: &mut BinaryReader<'_>) -> BdmvResult<Vec<ChapterMark>> {
    let section_len = r.u32()? as usize;
    if section_len > r.remaining() {
        return Err(BdmvError::LengthOverflow {
            section: "PlayListMark",
            declared: section_len,
            remaining: r.remaining(),
        });
    }
    let num_marks = r.u16()?;
    let mut marks = Vec::with_capacity(num_marks as usize);
    for mark_id in 0..num_marks {
        r.skip(1)?; // reserved
        let mark_type = r.u8()?;
        let play_item_ref = r.u16()?;
        let timestamp = r.u32()?;
        let entry_es_pid = r.u16()?;
        let duration = r.u32()?;
        marks.push(ChapterMark {
            mark_id,
            mark_type,
            play_item_ref,
            timestamp,
            entry_es_pid,
            duration_ms: duration as f64 / 45.0,
        });
    }
    Ok(marks)
}
