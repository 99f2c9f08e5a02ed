use crate::analyze::models::DiscAnalysis;
use crate::bdmv::models::{ticks_to_ms, Warning};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

/// Version tag of the output document.
pub const SCHEMA_VERSION: &str = "bdpl.disc.v1";

#[derive(Serialize)]
struct Document<'a> {
    schema_version: &'static str,
    disc: DiscDto,
    playlists: Vec<PlaylistDto>,
    clips: Vec<ClipDto>,
    episodes: Vec<EpisodeDto>,
    warnings: &'a [Warning],
    analysis: AnalysisDto,
}

#[derive(Serialize)]
struct DiscDto {
    path: String,
    generated_at: String,
}

#[derive(Serialize)]
struct PlaylistDto {
    mpls: String,
    duration_ms: f64,
    play_items: Vec<PlayItemDto>,
    chapters: Vec<ChapterDto>,
    classification: Option<&'static str>,
    signature_loose: Vec<(String, i64, i64)>,
}

#[derive(Serialize)]
struct PlayItemDto {
    clip_id: String,
    m2ts: String,
    in_time_ms: f64,
    out_time_ms: f64,
    duration_ms: f64,
    label: &'static str,
    streams: Vec<StreamDto>,
}

#[derive(Serialize)]
struct StreamDto {
    pid: u16,
    codec: &'static str,
    lang: String,
}

#[derive(Serialize)]
struct ChapterDto {
    mark_id: u16,
    mark_type: u8,
    timestamp: f64,
}

#[derive(Serialize)]
struct ClipDto {
    clip_id: String,
    streams: Vec<StreamDto>,
}

#[derive(Serialize)]
struct EpisodeDto {
    episode: u32,
    playlist: String,
    duration_ms: f64,
    confidence: f64,
    segments: Vec<SegmentDto>,
    alternates: Vec<String>,
}

#[derive(Serialize)]
struct SegmentDto {
    key: (String, i64, i64),
    clip_id: String,
    in_ms: f64,
    out_ms: f64,
    duration_ms: f64,
    label: &'static str,
}

#[derive(Serialize)]
struct AnalysisDto {
    classifications: BTreeMap<String, &'static str>,
    play_all: Vec<String>,
    duplicate_groups: Vec<Vec<String>>,
    hints: HintsDto,
}

#[derive(Serialize)]
struct HintsDto {
    titles: Vec<TitleHintDto>,
    ig_chapter_marks: Vec<u32>,
}

#[derive(Serialize)]
struct TitleHintDto {
    title: u16,
    movie_object: u16,
    playlists: Vec<String>,
}

fn build_document(analysis: &DiscAnalysis) -> Document<'_> {
    let playlists = analysis
        .playlists
        .iter()
        .map(|pl| PlaylistDto {
            mpls: pl.mpls.clone(),
            duration_ms: pl.duration_ms(),
            play_items: pl
                .play_items
                .iter()
                .map(|pi| PlayItemDto {
                    clip_id: pi.clip_id.clone(),
                    m2ts: pi.m2ts.clone(),
                    in_time_ms: ticks_to_ms(pi.in_time),
                    out_time_ms: ticks_to_ms(pi.out_time),
                    duration_ms: pi.duration_ms(),
                    label: pi.label.as_str(),
                    streams: pi
                        .streams
                        .iter()
                        .map(|s| StreamDto {
                            pid: s.pid,
                            codec: s.codec.name(),
                            lang: s.lang.clone(),
                        })
                        .collect(),
                })
                .collect(),
            chapters: pl
                .chapters
                .iter()
                .map(|ch| ChapterDto {
                    mark_id: ch.mark_id,
                    mark_type: ch.mark_type,
                    timestamp: ticks_to_ms(ch.timestamp),
                })
                .collect(),
            classification: analysis.classification(&pl.mpls).map(|c| c.as_str()),
            signature_loose: pl
                .signature_loose()
                .into_iter()
                .map(|key| (key.clip_id, key.in_ms, key.out_ms))
                .collect(),
        })
        .collect();

    let clips = analysis
        .clips
        .values()
        .map(|clip| ClipDto {
            clip_id: clip.clip_id.clone(),
            streams: clip
                .streams
                .iter()
                .map(|s| StreamDto {
                    pid: s.pid,
                    codec: s.codec.name(),
                    lang: s.lang.clone(),
                })
                .collect(),
        })
        .collect();

    let episodes = analysis
        .episodes
        .iter()
        .map(|ep| EpisodeDto {
            episode: ep.episode,
            playlist: ep.playlist.clone(),
            duration_ms: ep.duration_ms,
            confidence: ep.confidence,
            segments: ep
                .segments
                .iter()
                .map(|seg| SegmentDto {
                    key: (seg.key.clip_id.clone(), seg.key.in_ms, seg.key.out_ms),
                    clip_id: seg.clip_id.clone(),
                    in_ms: seg.in_ms,
                    out_ms: seg.out_ms,
                    duration_ms: seg.duration_ms,
                    label: seg.label.as_str(),
                })
                .collect(),
            alternates: ep.alternates.clone(),
        })
        .collect();

    Document {
        schema_version: SCHEMA_VERSION,
        disc: DiscDto {
            path: analysis.path.display().to_string(),
            generated_at: Utc::now().to_rfc3339(),
        },
        playlists,
        clips,
        episodes,
        warnings: &analysis.warnings,
        analysis: AnalysisDto {
            classifications: analysis
                .analysis
                .classifications
                .iter()
                .map(|(mpls, c)| (mpls.clone(), c.as_str()))
                .collect(),
            play_all: analysis.analysis.play_all.clone(),
            duplicate_groups: analysis.analysis.duplicate_groups.clone(),
            hints: HintsDto {
                titles: analysis
                    .analysis
                    .hints
                    .titles
                    .iter()
                    .map(|t| TitleHintDto {
                        title: t.title_number,
                        movie_object: t.movie_object_id,
                        playlists: t.playlists.clone(),
                    })
                    .collect(),
                ig_chapter_marks: analysis.analysis.hints.ig_chapter_marks.clone(),
            },
        },
    }
}

/// Serialize the analysis as a `bdpl.disc.v1` JSON document.
pub fn export_json(analysis: &DiscAnalysis, pretty: bool) -> serde_json::Result<String> {
    let document = build_document(analysis);
    if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
}
