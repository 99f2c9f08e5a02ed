use crate::analyze::models::{Classification, DiscHints, Episode, SegmentRef};
use crate::analyze::segment_graph::PlayAllCandidate;
use crate::analyze::signatures::DedupGroup;
use crate::bdmv::models::{ticks_to_ms, PlayItem, Playlist, SegmentKey, Warning, WarningCode};
use log::{debug, info};
use std::collections::BTreeMap;

/// Minimum duration of a play item to count as one episode when
/// decomposing a play-all playlist.
const PLAY_ALL_ITEM_MIN_S: f64 = 600.0;

/// Minimum duration of a lone playlist eligible for chapter splitting.
const CHAPTER_SPLIT_MIN_S: f64 = 2400.0;

/// Fallback target episode length when no menu hints are available.
const DEFAULT_EPISODE_MS: f64 = 22.0 * 60_000.0;

/// A piece closes once it reaches this share of the target length.
const MERGE_CLOSE_RATIO: f64 = 0.8;

const CONFIDENCE_INDIVIDUAL: f64 = 0.9;
const CONFIDENCE_PLAY_ALL: f64 = 0.7;
const CONFIDENCE_CHAPTER_SPLIT: f64 = 0.6;
const HINT_BOOST: f64 = 0.1;

fn segment_ref(pi: &PlayItem) -> SegmentRef {
    SegmentRef {
        key: pi.segment_key(),
        clip_id: pi.clip_id.clone(),
        in_ms: ticks_to_ms(pi.in_time),
        out_ms: ticks_to_ms(pi.out_time),
        duration_ms: pi.duration_ms(),
        label: pi.label,
    }
}

fn boost(confidence: f64, condition: bool) -> f64 {
    if condition {
        (confidence + HINT_BOOST).min(1.0)
    } else {
        confidence
    }
}

/// Infer the ordered episode list.
///
/// Strategies are tried in strict order: individual episode playlists,
/// play-all decomposition, chapter splitting. Navigation hints add
/// confidence but never change the selection.
pub fn infer_episodes(
    playlists: &[Playlist],
    classifications: &BTreeMap<String, Classification>,
    dedup_groups: &[DedupGroup],
    play_all: &[PlayAllCandidate],
    hints: &DiscHints,
    warnings: &mut Vec<Warning>,
) -> Vec<Episode> {
    let episode_playlists: Vec<&Playlist> = playlists
        .iter()
        .filter(|pl| classifications.get(&pl.mpls) == Some(&Classification::Episode))
        .collect();

    let episodes = if episode_playlists.len() >= 2 {
        info!(
            "Using {} individual episode playlists",
            episode_playlists.len()
        );
        episodes_from_individual(&episode_playlists, dedup_groups, hints)
    } else if let Some(candidate) = longest_play_all(playlists, play_all) {
        info!("Decomposing play-all playlist {}", candidate.mpls);
        let episodes = episodes_from_play_all(candidate, hints);
        if !episodes.is_empty() {
            warnings.push(
                Warning::new(
                    WarningCode::PlayAllOnly,
                    "episodes inferred by decomposing a play-all playlist; \
                     no individual episode playlists found",
                )
                .with_context("play_all", &candidate.mpls),
            );
        }
        episodes
    } else if let Some(pl) = chapter_split_candidate(playlists, classifications) {
        info!("Splitting {} by chapter marks", pl.mpls);
        episodes_from_chapters(pl, hints)
    } else {
        Vec::new()
    };

    if episodes.is_empty() {
        warnings.push(Warning::new(
            WarningCode::NoEpisodesFound,
            "could not identify any episodes on this disc",
        ));
    } else if episodes
        .iter()
        .all(|ep| ep.confidence <= CONFIDENCE_CHAPTER_SPLIT)
    {
        warnings.push(Warning::new(
            WarningCode::LowConfidenceOrder,
            "episode order is uncorroborated; verify before relying on it",
        ));
    }

    episodes
}

/// Order individual episode playlists by the clip id of their first body
/// segment; clip ids increase with airing order on practically all discs.
fn episodes_from_individual(
    episode_playlists: &[&Playlist],
    dedup_groups: &[DedupGroup],
    hints: &DiscHints,
) -> Vec<Episode> {
    let sort_key = |pl: &Playlist| -> (String, String) {
        let body_clip = pl
            .play_items
            .iter()
            .find(|pi| pi.label == crate::bdmv::models::SegmentLabel::Body)
            .or_else(|| pl.play_items.first())
            .map(|pi| pi.clip_id.clone())
            .unwrap_or_default();
        (body_clip, pl.mpls.clone())
    };

    let mut sorted: Vec<&Playlist> = episode_playlists.to_vec();
    sorted.sort_by_key(|pl| sort_key(pl));

    sorted
        .iter()
        .enumerate()
        .map(|(index, pl)| {
            let alternates = dedup_groups
                .iter()
                .find(|g| g.representative == pl.mpls)
                .map(|g| g.alternates.clone())
                .unwrap_or_default();
            Episode {
                episode: index as u32 + 1,
                playlist: pl.mpls.clone(),
                duration_ms: pl.duration_ms(),
                confidence: boost(CONFIDENCE_INDIVIDUAL, hints.title_references(&pl.mpls)),
                segments: pl.play_items.iter().map(segment_ref).collect(),
                alternates,
            }
        })
        .collect()
}

fn longest_play_all<'a>(
    playlists: &'a [Playlist],
    play_all: &[PlayAllCandidate],
) -> Option<&'a Playlist> {
    play_all
        .iter()
        .filter_map(|c| playlists.iter().find(|pl| pl.mpls == c.mpls))
        .max_by(|a, b| a.duration_ms().total_cmp(&b.duration_ms()))
}

/// Each episode-length play item of the play-all becomes one episode, in
/// on-disc order. Short trailing items (previews, bumpers) are dropped.
fn episodes_from_play_all(play_all: &Playlist, hints: &DiscHints) -> Vec<Episode> {
    let confidence = boost(CONFIDENCE_PLAY_ALL, hints.title_references(&play_all.mpls));
    let mut episodes = Vec::new();
    for pi in &play_all.play_items {
        if pi.duration_seconds() < PLAY_ALL_ITEM_MIN_S {
            debug!(
                "play-all item {} too short ({:.0}s), not an episode",
                pi.clip_id,
                pi.duration_seconds()
            );
            continue;
        }
        episodes.push(Episode {
            episode: episodes.len() as u32 + 1,
            playlist: play_all.mpls.clone(),
            duration_ms: pi.duration_ms(),
            confidence,
            segments: vec![segment_ref(pi)],
            alternates: Vec::new(),
        });
    }
    episodes
}

/// The chapter-split strategy applies only when exactly one long playlist
/// with usable marks exists.
fn chapter_split_candidate<'a>(
    playlists: &'a [Playlist],
    classifications: &BTreeMap<String, Classification>,
) -> Option<&'a Playlist> {
    let mut candidates = playlists.iter().filter(|pl| {
        classifications.get(&pl.mpls) != Some(&Classification::DuplicateVariant)
            && pl.duration_seconds() >= CHAPTER_SPLIT_MIN_S
            && pl.chapters.len() >= 2
    });
    let first = candidates.next()?;
    if candidates.next().is_some() {
        return None;
    }
    Some(first)
}

/// One chapter-bounded slice of the long playlist's timeline.
struct ChapterSpan<'a> {
    item: &'a PlayItem,
    start_ticks: u32,
    end_ticks: u32,
}

impl ChapterSpan<'_> {
    fn duration_ms(&self) -> f64 {
        ticks_to_ms(self.end_ticks.saturating_sub(self.start_ticks))
    }
}

fn chapter_spans(pl: &Playlist) -> Vec<ChapterSpan<'_>> {
    // Entry marks (type 1) delimit chapters; link points do not.
    let mut marks: Vec<_> = pl.chapters.iter().filter(|m| m.mark_type == 1).collect();
    if marks.is_empty() {
        marks = pl.chapters.iter().collect();
    }
    marks.sort_by_key(|m| (m.play_item_ref, m.timestamp));

    let mut spans = Vec::new();
    for (index, mark) in marks.iter().enumerate() {
        let Some(item) = pl.play_items.get(mark.play_item_ref as usize) else {
            continue;
        };
        let end_ticks = match marks.get(index + 1) {
            Some(next) if next.play_item_ref == mark.play_item_ref => next.timestamp,
            _ => item.out_time,
        };
        spans.push(ChapterSpan {
            item,
            start_ticks: mark.timestamp,
            end_ticks,
        });
    }
    spans
}

/// Target episode length: the median spacing of menu-referenced chapter
/// marks when present, 22 minutes otherwise.
fn target_episode_ms(spans: &[ChapterSpan<'_>], hints: &DiscHints) -> f64 {
    let mut offsets = Vec::new();
    let mut cumulative = 0.0;
    for span in spans {
        offsets.push(cumulative);
        cumulative += span.duration_ms();
    }

    let marked: Vec<f64> = hints
        .ig_chapter_marks
        .iter()
        .filter_map(|&idx| offsets.get(idx as usize).copied())
        .collect();
    if marked.len() >= 2 {
        let mut spacing: Vec<f64> = marked.windows(2).map(|w| w[1] - w[0]).collect();
        spacing.sort_by(|a, b| a.total_cmp(b));
        let median = spacing[spacing.len() / 2];
        if median > 0.0 {
            return median;
        }
    }
    DEFAULT_EPISODE_MS
}

/// Partition a single long playlist by its chapter marks, merging adjacent
/// chapters until each piece approaches the target length.
fn episodes_from_chapters(pl: &Playlist, hints: &DiscHints) -> Vec<Episode> {
    let spans = chapter_spans(pl);
    if spans.len() < 2 {
        return Vec::new();
    }
    let target_ms = target_episode_ms(&spans, hints);

    let mut episodes: Vec<Episode> = Vec::new();
    let mut split_starts: Vec<usize> = Vec::new();
    let mut acc_segments: Vec<SegmentRef> = Vec::new();
    let mut acc_ms = 0.0;
    let mut acc_start = 0usize;

    for (index, span) in spans.iter().enumerate() {
        if acc_segments.is_empty() {
            acc_start = index;
        }
        acc_segments.push(SegmentRef {
            key: SegmentKey::new(&span.item.clip_id, span.start_ticks, span.end_ticks),
            clip_id: span.item.clip_id.clone(),
            in_ms: ticks_to_ms(span.start_ticks),
            out_ms: ticks_to_ms(span.end_ticks),
            duration_ms: span.duration_ms(),
            label: span.item.label,
        });
        acc_ms += span.duration_ms();

        if acc_ms >= MERGE_CLOSE_RATIO * target_ms {
            episodes.push(Episode {
                episode: episodes.len() as u32 + 1,
                playlist: pl.mpls.clone(),
                duration_ms: acc_ms,
                confidence: CONFIDENCE_CHAPTER_SPLIT,
                segments: std::mem::take(&mut acc_segments),
                alternates: Vec::new(),
            });
            split_starts.push(acc_start);
            acc_ms = 0.0;
        }
    }

    // Fold a short tail into the final episode rather than emitting a
    // fragment.
    if !acc_segments.is_empty() {
        if let Some(last) = episodes.last_mut() {
            last.duration_ms += acc_ms;
            last.segments.append(&mut acc_segments);
        } else {
            episodes.push(Episode {
                episode: 1,
                playlist: pl.mpls.clone(),
                duration_ms: acc_ms,
                confidence: CONFIDENCE_CHAPTER_SPLIT,
                segments: acc_segments,
                alternates: Vec::new(),
            });
            split_starts.push(acc_start);
        }
    }

    let ig_agrees = !hints.ig_chapter_marks.is_empty()
        && hints.ig_chapter_marks.len() == split_starts.len()
        && split_starts
            .iter()
            .zip(&hints.ig_chapter_marks)
            .all(|(&start, &mark)| (start as i64 - mark as i64).abs() <= 1);

    for ep in &mut episodes {
        ep.confidence = boost(
            boost(ep.confidence, hints.title_references(&pl.mpls)),
            ig_agrees,
        );
    }
    episodes
}
