//! Shared in-memory fixture builders for analysis tests.

use crate::bdmv::models::{
    ChapterMark, Codec, PlayItem, Playlist, SegmentLabel, StreamInfo,
};

pub fn ticks(seconds: f64) -> u32 {
    (seconds * 45_000.0).round() as u32
}

pub fn item(clip_id: &str, start_s: f64, end_s: f64) -> PlayItem {
    PlayItem {
        clip_id: clip_id.to_string(),
        m2ts: format!("{clip_id}.m2ts"),
        in_time: ticks(start_s),
        out_time: ticks(end_s),
        connection_condition: 0,
        streams: Vec::new(),
        label: SegmentLabel::Unknown,
    }
}

pub fn playlist(mpls: &str, items: &[(&str, f64, f64)]) -> Playlist {
    Playlist {
        mpls: mpls.to_string(),
        version: "0200".to_string(),
        play_items: items
            .iter()
            .map(|&(clip_id, start_s, end_s)| item(clip_id, start_s, end_s))
            .collect(),
        chapters: Vec::new(),
        is_multi_angle: false,
    }
}

/// Playlist whose first item advertises the given audio / subtitle track
/// counts.
pub fn playlist_with_streams(
    mpls: &str,
    items: &[(&str, f64, f64)],
    audio: usize,
    subtitles: usize,
) -> Playlist {
    let mut pl = playlist(mpls, items);
    if let Some(first) = pl.play_items.first_mut() {
        first.streams.push(StreamInfo {
            pid: 0x1011,
            coding_type: 0x1B,
            codec: Codec::H264,
            lang: String::new(),
        });
        for i in 0..audio {
            first.streams.push(StreamInfo {
                pid: 0x1100 + i as u16,
                coding_type: 0x81,
                codec: Codec::Ac3,
                lang: "jpn".to_string(),
            });
        }
        for i in 0..subtitles {
            first.streams.push(StreamInfo {
                pid: 0x1200 + i as u16,
                coding_type: 0x90,
                codec: Codec::Pgs,
                lang: "eng".to_string(),
            });
        }
    }
    pl
}

/// Playlist with type-1 chapter marks at the given second offsets, all
/// referencing the first play item.
pub fn playlist_with_chapters(
    mpls: &str,
    items: &[(&str, f64, f64)],
    chapter_offsets_s: &[f64],
) -> Playlist {
    let mut pl = playlist(mpls, items);
    pl.chapters = chapter_offsets_s
        .iter()
        .enumerate()
        .map(|(i, &offset_s)| ChapterMark {
            mark_id: i as u16,
            mark_type: 1,
            play_item_ref: 0,
            timestamp: ticks(offset_s),
            entry_es_pid: 0,
            duration_ms: 0.0,
        })
        .collect();
    pl
}
