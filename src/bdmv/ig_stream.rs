//! Experimental parser for IG (Interactive Graphics) menu streams.
//!
//! Scans a menu m2ts for the Interactive Composition Segment and extracts
//! button navigation commands. These can reveal episode → playlist /
//! chapter mappings embedded in the disc menu. Malformed packets and
//! segments are skipped; this stage never fails the pipeline.

use crate::bdmv::error::BdmvResult;
use crate::bdmv::models::{Warning, WarningCode};
use crate::bdmv::movie_object::{NavCommand, NAV_COMMAND_SIZE};
use crate::bdmv::reader::BinaryReader;
use log::debug;

/// IG stream PIDs reserved by the BD-ROM application format.
const IG_PID_MIN: u16 = 0x1400;
const IG_PID_MAX: u16 = 0x141F;

/// Segment type of the Interactive Composition Segment.
const SEG_ICS: u8 = 0x18;

const TS_PACKET_SIZE: usize = 188;
const M2TS_PACKET_SIZE: usize = 192;
const SYNC_BYTE: u8 = 0x47;

/// Upper bound on transport packets examined per file.
pub const MAX_SCAN_PACKETS: usize = 200_000;

/// Byte prefix of a menu stream worth reading, given the packet cap.
pub const MAX_SCAN_BYTES: usize = MAX_SCAN_PACKETS * M2TS_PACKET_SIZE;

/// A button in an IG menu page.
#[derive(Debug, Clone)]
pub struct IgButton {
    pub button_id: u16,
    pub x: u16,
    pub y: u16,
    pub auto_action: bool,
    pub commands: Vec<NavCommand>,
}

/// One page of the interactive menu.
#[derive(Debug, Clone)]
pub struct IgPage {
    pub page_id: u8,
    pub default_button: u16,
    pub default_activated: u16,
    pub buttons: Vec<IgButton>,
}

/// Parsed Interactive Composition Segment.
#[derive(Debug, Clone)]
pub struct InteractiveComposition {
    pub width: u16,
    pub height: u16,
    pub pages: Vec<IgPage>,
}

/// What a menu button does when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgActionKind {
    PlayPl,
    PlayPlAtChapter,
    PlayPlAtMark,
    JumpTitle,
    SetRegister,
}

impl IgActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgActionKind::PlayPl => "PlayPL",
            IgActionKind::PlayPlAtChapter => "PlayPLAtChapter",
            IgActionKind::PlayPlAtMark => "PlayPLAtMark",
            IgActionKind::JumpTitle => "JumpTitle",
            IgActionKind::SetRegister => "SetRegister",
        }
    }
}

/// An actionable hint extracted from one IG button command.
#[derive(Debug, Clone)]
pub struct IgButtonAction {
    pub page_id: u8,
    pub button_id: u16,
    pub kind: IgActionKind,
    pub operand1: u32,
    pub operand2: u32,
}

/// Scan a menu stream buffer and parse the first ICS found.
///
/// Returns `None` when the buffer carries no IG data or the composition is
/// unreadable; the failure is downgraded to a warning.
pub fn scan_ig_stream(
    data: &[u8],
    source: &str,
    warnings: &mut Vec<Warning>,
) -> Option<InteractiveComposition> {
    let pes_data = demux_ig_stream(data, MAX_SCAN_PACKETS, source, warnings);
    if pes_data.is_empty() {
        debug!("{source}: no IG PES data found");
        return None;
    }
    let ics_data = extract_ics(&pes_data)?;
    match parse_ics(ics_data) {
        Ok(ics) => Some(ics),
        Err(e) => {
            debug!("{source}: unreadable ICS: {e}");
            warnings.push(
                Warning::new(
                    WarningCode::MalformedSection,
                    format!("interactive composition unreadable: {e}"),
                )
                .with_context("file", source),
            );
            None
        }
    }
}

/// Extract the PES payload of the first IG PID seen, bounded by
/// `max_packets` transport packets.
fn demux_ig_stream(
    data: &[u8],
    max_packets: usize,
    source: &str,
    warnings: &mut Vec<Warning>,
) -> Vec<u8> {
    // m2ts packets carry a 4-byte arrival timestamp before the TS packet;
    // plain captures start on the sync byte directly.
    let (packet_size, ts_offset) = if data.len() >= M2TS_PACKET_SIZE
        && data[4] == SYNC_BYTE
        && data[0] != SYNC_BYTE
    {
        (M2TS_PACKET_SIZE, 4)
    } else {
        (TS_PACKET_SIZE, 0)
    };

    let mut pes_data = Vec::new();
    let mut ig_pid: Option<u16> = None;
    let mut pos = 0;
    let mut packets = 0usize;

    while pos + packet_size <= data.len() {
        if packets >= max_packets {
            warnings.push(
                Warning::new(
                    WarningCode::IgScanTruncated,
                    format!("menu scan stopped after {max_packets} transport packets"),
                )
                .with_context("file", source),
            );
            break;
        }
        packets += 1;

        let ts = &data[pos + ts_offset..pos + packet_size];
        if ts[0] != SYNC_BYTE {
            // Lost sync: advance byte-wise until the next sync byte.
            pos += 1;
            continue;
        }

        let pusi = (ts[1] >> 6) & 1 == 1;
        let pid = ((ts[1] as u16 & 0x1F) << 8) | ts[2] as u16;
        let adaptation = (ts[3] >> 4) & 0x03;

        if ig_pid.is_none() && (IG_PID_MIN..=IG_PID_MAX).contains(&pid) {
            debug!("{source}: auto-detected IG PID {pid:#06x}");
            ig_pid = Some(pid);
        }

        if Some(pid) == ig_pid {
            let mut offset = 4;
            if adaptation == 2 || adaptation == 3 {
                offset = 5 + ts[4] as usize;
            }
            if (adaptation == 1 || adaptation == 3) && offset < ts.len() {
                let payload = &ts[offset..];
                if pusi && payload.len() >= 9 && payload[..3] == [0x00, 0x00, 0x01] {
                    let header_len = payload[8] as usize;
                    if 9 + header_len <= payload.len() {
                        pes_data.extend_from_slice(&payload[9 + header_len..]);
                    }
                } else {
                    pes_data.extend_from_slice(payload);
                }
            }
        }

        pos += packet_size;
    }

    pes_data
}

/// Walk the segment stream and return the body of the first ICS.
fn extract_ics(pes_data: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos + 3 <= pes_data.len() {
        let seg_type = pes_data[pos];
        let seg_len = ((pes_data[pos + 1] as usize) << 8) | pes_data[pos + 2] as usize;
        if seg_type == SEG_ICS {
            let end = (pos + 3 + seg_len).min(pes_data.len());
            return Some(&pes_data[pos + 3..end]);
        }
        if seg_len == 0 {
            break;
        }
        pos += 3 + seg_len;
    }
    None
}

/// Parse an ICS body (bytes after the 3-byte segment header).
pub fn parse_ics(data: &[u8]) -> BdmvResult<InteractiveComposition> {
    let mut r = BinaryReader::new(data);

    // video_descriptor
    let width = r.u16()?;
    let height = r.u16()?;
    r.skip(1)?; // frame rate

    r.skip(4)?; // composition_descriptor + sequence_descriptor
    r.skip(3)?; // interactive_composition_data_length (24 bits)

    let model = r.u8()?;
    let stream_model = (model >> 7) & 1;
    if stream_model == 0 {
        r.skip(10)?; // composition + selection timeout PTS
    }
    r.skip(3)?; // user_timeout_duration (24 bits)

    let num_pages = r.u8()?;
    let mut pages = Vec::with_capacity(num_pages as usize);
    for _ in 0..num_pages {
        pages.push(parse_page(&mut r)?);
    }

    Ok(InteractiveComposition {
        width,
        height,
        pages,
    })
}

fn parse_page(r: &mut BinaryReader<'_>) -> BdmvResult<IgPage> {
    let page_id = r.u8()?;
    r.skip(1)?; // page version
    r.skip(8)?; // UO mask table

    // in_effects + out_effects
    for _ in 0..2 {
        skip_effect_sequence(r)?;
    }

    r.skip(1)?; // animation_frame_rate_code
    let default_button = r.u16()?;
    let default_activated = r.u16()?;
    r.skip(1)?; // palette_id_ref

    let num_bogs = r.u8()?;
    let mut buttons = Vec::new();
    for _ in 0..num_bogs {
        r.skip(2)?; // bog default button
        let num_buttons = r.u8()?;
        for _ in 0..num_buttons {
            buttons.push(parse_button(r)?);
        }
    }

    Ok(IgPage {
        page_id,
        default_button,
        default_activated,
        buttons,
    })
}

fn skip_effect_sequence(r: &mut BinaryReader<'_>) -> BdmvResult<()> {
    let num_windows = r.u8()?;
    r.skip(num_windows as usize * 9)?;
    let num_effects = r.u8()?;
    for _ in 0..num_effects {
        r.skip(4)?; // duration (24 bits) + palette_id_ref
        let num_objects = r.u8()?;
        for _ in 0..num_objects {
            r.skip(3)?; // object_id + window_id
            let flags = r.u8()?;
            r.skip(4)?; // x, y
            if (flags >> 7) & 1 == 1 {
                r.skip(8)?; // crop rectangle
            }
        }
    }
    Ok(())
}

fn parse_button(r: &mut BinaryReader<'_>) -> BdmvResult<IgButton> {
    let button_id = r.u16()?;
    r.skip(2)?; // numeric select value
    let auto_action = (r.u8()? >> 7) & 1 == 1;
    let x = r.u16()?;
    let y = r.u16()?;
    r.skip(8)?; // neighbor button ids

    // Normal / selected / activated state object runs share one command
    // list that follows them.
    r.skip(5)?;
    r.skip(6)?;
    r.skip(5)?;

    let num_commands = r.u16()?;
    let mut commands = Vec::with_capacity(num_commands as usize);
    for _ in 0..num_commands {
        let mut raw = [0u8; NAV_COMMAND_SIZE];
        raw.copy_from_slice(r.read_bytes(NAV_COMMAND_SIZE)?);
        commands.push(NavCommand::decode(raw));
    }

    Ok(IgButton {
        button_id,
        x,
        y,
        auto_action,
        commands,
    })
}

/// Extract actionable hints from parsed menu buttons.
pub fn extract_button_actions(ics: &InteractiveComposition) -> Vec<IgButtonAction> {
    let mut actions = Vec::new();
    for page in &ics.pages {
        for button in &page.buttons {
            for cmd in &button.commands {
                let kind = if cmd.is_play_playlist() {
                    match cmd.op_code {
                        0 => IgActionKind::PlayPl,
                        1 => IgActionKind::PlayPlAtChapter,
                        _ => IgActionKind::PlayPlAtMark,
                    }
                } else if cmd.is_jump_title() {
                    IgActionKind::JumpTitle
                } else if cmd.group == 2
                    && cmd.sub_group == 0
                    && cmd.imm_op2
                    && cmd.operand1 < 0x1000
                {
                    IgActionKind::SetRegister
                } else {
                    continue;
                };
                actions.push(IgButtonAction {
                    page_id: page.page_id,
                    button_id: button.button_id,
                    kind,
                    operand1: cmd.operand1,
                    operand2: cmd.operand2,
                });
            }
        }
    }
    actions
}

/// Chapter-mark numbers referenced by mark- and chapter-targeted play
/// actions, sorted and deduplicated.
pub fn ig_chapter_marks(actions: &[IgButtonAction]) -> Vec<u32> {
    let mut marks: Vec<u32> = actions
        .iter()
        .filter(|a| {
            matches!(
                a.kind,
                IgActionKind::PlayPlAtMark | IgActionKind::PlayPlAtChapter
            )
        })
        .map(|a| a.operand2)
        .collect();
    marks.sort_unstable();
    marks.dedup();
    marks
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Write;

    fn play_pl_command(op_code: u8, playlist: u32, mark: u32) -> [u8; 12] {
        let mut raw = [0u8; 12];
        raw[0] = (2 << 5) | 0x02; // branch group, play sub-group
        raw[1] = 0xC0 | op_code;
        raw[4..8].copy_from_slice(&playlist.to_be_bytes());
        raw[8..12].copy_from_slice(&mark.to_be_bytes());
        raw
    }

    fn build_ics_body(commands: &[[u8; 12]]) -> Vec<u8> {
        let mut ics = Vec::new();
        ics.write_u16::<BigEndian>(1920).unwrap();
        ics.write_u16::<BigEndian>(1080).unwrap();
        ics.write_u8(0x10).unwrap(); // frame rate
        ics.write_all(&[0u8; 4]).unwrap(); // composition + sequence descriptors
        ics.write_all(&[0u8; 3]).unwrap(); // data length
        ics.write_u8(0x80).unwrap(); // stream model 1: no timeout PTS fields
        ics.write_all(&[0u8; 3]).unwrap(); // user timeout
        ics.write_u8(1).unwrap(); // one page

        ics.write_u8(0).unwrap(); // page id
        ics.write_u8(0).unwrap(); // page version
        ics.write_all(&[0u8; 8]).unwrap(); // UO mask
        ics.write_all(&[0, 0]).unwrap(); // in_effects: windows, effects
        ics.write_all(&[0, 0]).unwrap(); // out_effects
        ics.write_u8(0).unwrap(); // frame rate code
        ics.write_u16::<BigEndian>(1).unwrap(); // default button
        ics.write_u16::<BigEndian>(1).unwrap(); // default activated
        ics.write_u8(0).unwrap(); // palette
        ics.write_u8(1).unwrap(); // one BOG

        ics.write_u16::<BigEndian>(1).unwrap(); // bog default button
        ics.write_u8(1).unwrap(); // one button

        ics.write_u16::<BigEndian>(1).unwrap(); // button id
        ics.write_u16::<BigEndian>(0).unwrap(); // numeric select
        ics.write_u8(0).unwrap(); // flags
        ics.write_u16::<BigEndian>(100).unwrap(); // x
        ics.write_u16::<BigEndian>(200).unwrap(); // y
        ics.write_all(&[0u8; 8]).unwrap(); // neighbors
        ics.write_all(&[0u8; 16]).unwrap(); // state object runs
        ics.write_u16::<BigEndian>(commands.len() as u16).unwrap();
        for cmd in commands {
            ics.write_all(cmd).unwrap();
        }
        ics
    }

    fn build_pes(ics_body: &[u8]) -> Vec<u8> {
        let mut pes = Vec::new();
        pes.write_all(&[0x00, 0x00, 0x01, 0xBD]).unwrap();
        pes.write_u16::<BigEndian>(0).unwrap(); // PES length (unused)
        pes.write_all(&[0x80, 0x00, 0x00]).unwrap(); // flags + header length 0
        pes.write_u8(SEG_ICS).unwrap();
        pes.write_u16::<BigEndian>(ics_body.len() as u16).unwrap();
        pes.write_all(ics_body).unwrap();
        pes
    }

    fn packetize(pes: &[u8], pid: u16, m2ts: bool) -> Vec<u8> {
        let mut out = Vec::new();
        let mut cc = 0u8;
        for (i, chunk) in pes.chunks(184).enumerate() {
            if m2ts {
                out.write_all(&[0u8; 4]).unwrap(); // arrival timestamp
            }
            out.write_u8(SYNC_BYTE).unwrap();
            let pusi = if i == 0 { 0x40 } else { 0x00 };
            out.write_u8(pusi | ((pid >> 8) as u8 & 0x1F)).unwrap();
            out.write_u8(pid as u8).unwrap();
            out.write_u8(0x10 | (cc & 0x0F)).unwrap();
            out.write_all(chunk).unwrap();
            for _ in chunk.len()..184 {
                out.write_u8(0xFF).unwrap();
            }
            cc = cc.wrapping_add(1);
        }
        out
    }

    #[test]
    fn scans_m2ts_and_extracts_button_commands() {
        let ics_body = build_ics_body(&[play_pl_command(2, 5, 3)]);
        let data = packetize(&build_pes(&ics_body), 0x1400, true);

        let mut warnings = Vec::new();
        let ics = scan_ig_stream(&data, "00099.m2ts", &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(ics.width, 1920);
        assert_eq!(ics.pages.len(), 1);
        let button = &ics.pages[0].buttons[0];
        assert_eq!(button.button_id, 1);
        assert_eq!(button.x, 100);
        assert_eq!(button.commands.len(), 1);
        assert_eq!(button.commands[0].playlist_number(), Some(5));
    }

    #[test]
    fn scans_plain_ts_alignment_too() {
        let ics_body = build_ics_body(&[play_pl_command(0, 1, 0)]);
        let data = packetize(&build_pes(&ics_body), 0x141F, false);
        let ics = scan_ig_stream(&data, "menu.ts", &mut Vec::new()).unwrap();
        assert_eq!(ics.pages[0].buttons[0].commands[0].playlist_number(), Some(1));
    }

    #[test]
    fn button_actions_and_chapter_marks_are_extracted() {
        let ics_body = build_ics_body(&[
            play_pl_command(2, 5, 10),
            play_pl_command(2, 5, 0),
            play_pl_command(0, 7, 0),
        ]);
        let data = packetize(&build_pes(&ics_body), 0x1400, true);
        let ics = scan_ig_stream(&data, "00099.m2ts", &mut Vec::new()).unwrap();

        let actions = extract_button_actions(&ics);
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].kind, IgActionKind::PlayPlAtMark);
        assert_eq!(actions[0].operand1, 5);
        assert_eq!(actions[0].operand2, 10);
        assert_eq!(actions[2].kind, IgActionKind::PlayPl);

        assert_eq!(ig_chapter_marks(&actions), vec![0, 10]);
    }

    #[test]
    fn non_ig_stream_yields_nothing() {
        // Video PID only; scanner finds no IG PID.
        let data = packetize(&[0u8; 400], 0x1011, true);
        assert!(scan_ig_stream(&data, "00001.m2ts", &mut Vec::new()).is_none());
    }

    #[test]
    fn packet_cap_truncates_with_warning() {
        // Enough commands to spread the PES across multiple packets.
        let commands: Vec<[u8; 12]> = (0..24).map(|i| play_pl_command(0, i, 0)).collect();
        let ics_body = build_ics_body(&commands);
        let pes = build_pes(&ics_body);
        let data = packetize(&pes, 0x1400, true);

        let mut warnings = Vec::new();
        let pes_out = demux_ig_stream(&data, 1, "00099.m2ts", &mut warnings);
        assert!(pes_out.len() < pes.len());
        assert!(warnings
            .iter()
            .any(|w| w.code == WarningCode::IgScanTruncated));
    }

    #[test]
    fn garbage_between_packets_is_resynced() {
        let ics_body = build_ics_body(&[play_pl_command(0, 9, 0)]);
        let mut data = vec![0xAAu8; 7]; // leading junk shifts alignment
        data.extend(packetize(&build_pes(&ics_body), 0x1400, false));
        let ics = scan_ig_stream(&data, "menu.ts", &mut Vec::new()).unwrap();
        assert_eq!(ics.pages[0].buttons[0].commands[0].playlist_number(), Some(9));
    }
}
