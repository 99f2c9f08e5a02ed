use crate::bdmv::error::{BdmvError, BdmvResult};
use crate::bdmv::models::{Warning, WarningCode};
use crate::bdmv::reader::BinaryReader;
use std::collections::BTreeMap;

const MAGIC: &str = "MOBJ";

/// Size of one HDMV navigation command.
pub const NAV_COMMAND_SIZE: usize = 12;

const GROUP_BRANCH: u8 = 0;
const SUB_GROUP_JUMP: u8 = 1;
const SUB_GROUP_PLAY: u8 = 2;

/// A single 12-byte HDMV navigation command.
///
/// Byte 0 packs operand-count(3) | group(2) | sub-group(3); byte 1 packs
/// imm1(1) | imm2(1) | reserved(2) | opcode(4); operands are big-endian
/// u32 values at bytes 4..8 and 8..12.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavCommand {
    pub raw: [u8; NAV_COMMAND_SIZE],
    pub group: u8,
    pub sub_group: u8,
    pub op_code: u8,
    pub imm_op1: bool,
    pub imm_op2: bool,
    pub operand1: u32,
    pub operand2: u32,
}

impl NavCommand {
    pub fn decode(raw: [u8; NAV_COMMAND_SIZE]) -> Self {
        let b0 = raw[0];
        let b1 = raw[1];
        NavCommand {
            group: (b0 >> 3) & 0x03,
            sub_group: b0 & 0x07,
            op_code: b1 & 0x0F,
            imm_op1: (b1 >> 7) & 1 == 1,
            imm_op2: (b1 >> 6) & 1 == 1,
            operand1: u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
            operand2: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
            raw,
        }
    }

    /// PlayPL, PlayPL-at-play-item or PlayPL-at-mark.
    pub fn is_play_playlist(&self) -> bool {
        self.group == GROUP_BRANCH && self.sub_group == SUB_GROUP_PLAY && self.op_code <= 2
    }

    pub fn is_jump_title(&self) -> bool {
        self.group == GROUP_BRANCH && self.sub_group == SUB_GROUP_JUMP && self.op_code == 1
    }

    /// The operand-count bits use values 0..=2; the group bits use 0..=2.
    /// Anything else is outside the documented instruction set.
    pub fn is_known_group(&self) -> bool {
        self.group <= 2
    }

    /// Playlist number referenced by a play command.
    pub fn playlist_number(&self) -> Option<u32> {
        if self.is_play_playlist() {
            Some(self.operand1)
        } else {
            None
        }
    }
}

/// One movie object: a sequence of navigation commands.
#[derive(Debug, Clone)]
pub struct MovieObject {
    pub object_id: u16,
    pub resume_intention: bool,
    pub menu_call_mask: bool,
    pub title_search_mask: bool,
    pub commands: Vec<NavCommand>,
}

impl MovieObject {
    /// Playlist filename stems referenced by play commands, zero-padded to
    /// the five-digit on-disc form.
    pub fn referenced_playlists(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(NavCommand::playlist_number)
            .map(|n| format!("{n:05}"))
            .collect()
    }

    pub fn referenced_titles(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter(|c| c.is_jump_title())
            .map(|c| c.operand1)
            .collect()
    }
}

/// Parsed contents of a `MovieObject.bdmv` file.
#[derive(Debug, Clone, Default)]
pub struct MovieObjectBdmv {
    pub version: String,
    pub objects: Vec<MovieObject>,
}

impl MovieObjectBdmv {
    /// Map playlist stem → movie object ids that play it.
    pub fn playlist_to_objects(&self) -> BTreeMap<String, Vec<u16>> {
        let mut result: BTreeMap<String, Vec<u16>> = BTreeMap::new();
        for obj in &self.objects {
            for stem in obj.referenced_playlists() {
                result.entry(stem).or_default().push(obj.object_id);
            }
        }
        result
    }
}

/// Parse a `MovieObject.bdmv` buffer.
pub fn parse_movie_object(data: &[u8], warnings: &mut Vec<Warning>) -> BdmvResult<MovieObjectBdmv> {
    let mut r = BinaryReader::new(data);

    let magic = r.read_string(4)?;
    if magic != MAGIC {
        return Err(BdmvError::MagicMismatch {
            expected: MAGIC,
            got: magic,
        });
    }
    let version = r.read_string(4)?;

    // Rest of the 40-byte header: extension data offset plus padding.
    r.seek(40)?;

    let section_len = r.u32()? as usize;
    if section_len > r.remaining() {
        return Err(BdmvError::LengthOverflow {
            section: "MovieObjects",
            declared: section_len,
            remaining: r.remaining(),
        });
    }
    r.skip(4)?; // reserved
    let num_objects = r.u16()?;

    let mut objects = Vec::with_capacity(num_objects as usize);
    for object_id in 0..num_objects {
        let flags = r.u8()?;
        let resume_intention = (flags >> 7) & 1 == 1;
        let menu_call_mask = (flags >> 6) & 1 == 1;
        let title_search_mask = (flags >> 5) & 1 == 1;
        r.skip(1)?; // reserved
        let num_commands = r.u16()?;

        let mut commands = Vec::with_capacity(num_commands as usize);
        for _ in 0..num_commands {
            let mut raw = [0u8; NAV_COMMAND_SIZE];
            raw.copy_from_slice(r.read_bytes(NAV_COMMAND_SIZE)?);
            let cmd = NavCommand::decode(raw);
            if !cmd.is_known_group() {
                let cause = BdmvError::UnknownEnum {
                    field: "navigation command group",
                    raw: cmd.group as u32,
                };
                warnings.push(
                    Warning::new(
                        WarningCode::UnknownOpcode,
                        format!("movie object {object_id}: {cause}"),
                    )
                    .with_context("object_id", object_id.to_string()),
                );
            }
            commands.push(cmd);
        }

        objects.push(MovieObject {
            object_id,
            resume_intention,
            menu_call_mask,
            title_search_mask,
            commands,
        });
    }

    Ok(MovieObjectBdmv { version, objects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Write;

    fn play_pl_command(op_code: u8, playlist: u32, mark: u32) -> [u8; 12] {
        let mut raw = [0u8; 12];
        raw[0] = (2 << 5) | (GROUP_BRANCH << 3) | SUB_GROUP_PLAY;
        raw[1] = 0xC0 | op_code; // both operands immediate
        raw[4..8].copy_from_slice(&playlist.to_be_bytes());
        raw[8..12].copy_from_slice(&mark.to_be_bytes());
        raw
    }

    fn build_mobj(objects: &[Vec<[u8; 12]>]) -> Vec<u8> {
        let mut body = Vec::new();
        body.write_u32::<BigEndian>(0).unwrap(); // reserved
        body.write_u16::<BigEndian>(objects.len() as u16).unwrap();
        for commands in objects {
            body.write_u8(0).unwrap(); // flags
            body.write_u8(0).unwrap(); // reserved
            body.write_u16::<BigEndian>(commands.len() as u16).unwrap();
            for raw in commands {
                body.write_all(raw).unwrap();
            }
        }

        let mut data = Vec::new();
        data.write_all(b"MOBJ0200").unwrap();
        data.resize(40, 0);
        data.write_u32::<BigEndian>(body.len() as u32).unwrap();
        data.extend_from_slice(&body);
        data
    }

    #[test]
    fn decodes_play_playlist_commands() {
        let cmd = NavCommand::decode(play_pl_command(0, 7, 0));
        assert!(cmd.is_play_playlist());
        assert_eq!(cmd.playlist_number(), Some(7));
        assert_eq!(cmd.operand2, 0);
    }

    #[test]
    fn referenced_playlists_are_zero_padded_stems() {
        let data = build_mobj(&[vec![
            play_pl_command(0, 1, 0),
            play_pl_command(2, 23, 4),
        ]]);
        let mut warnings = Vec::new();
        let mobj = parse_movie_object(&data, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(mobj.objects.len(), 1);
        assert_eq!(
            mobj.objects[0].referenced_playlists(),
            vec!["00001".to_string(), "00023".to_string()]
        );
    }

    #[test]
    fn unknown_command_group_warns_but_is_preserved() {
        let mut unknown = [0u8; 12];
        unknown[0] = 3 << 3; // group 3 is outside the instruction set
        let data = build_mobj(&[vec![unknown, play_pl_command(0, 2, 0)]]);
        let mut warnings = Vec::new();
        let mobj = parse_movie_object(&data, &mut warnings).unwrap();
        assert_eq!(mobj.objects[0].commands.len(), 2);
        assert_eq!(mobj.objects[0].commands[0].raw, unknown);
        assert!(warnings.iter().any(|w| w.code == WarningCode::UnknownOpcode));
        assert_eq!(
            mobj.objects[0].referenced_playlists(),
            vec!["00002".to_string()]
        );
    }

    #[test]
    fn playlist_to_objects_maps_shared_references() {
        let data = build_mobj(&[
            vec![play_pl_command(0, 5, 0)],
            vec![play_pl_command(0, 5, 0), play_pl_command(0, 9, 0)],
        ]);
        let mobj = parse_movie_object(&data, &mut Vec::new()).unwrap();
        let map = mobj.playlist_to_objects();
        assert_eq!(map.get("00005"), Some(&vec![0, 1]));
        assert_eq!(map.get("00009"), Some(&vec![1]));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = parse_movie_object(b"INDX0200", &mut Vec::new()).unwrap_err();
        assert!(matches!(err, BdmvError::MagicMismatch { .. }));
    }
}
