use crate::analyze::clustering::DurationCluster;
use crate::analyze::models::Classification;
use crate::bdmv::models::{Playlist, SegmentKey, SegmentLabel};
use std::collections::{BTreeMap, BTreeSet};

const LEGAL_MAX_S: f64 = 8.0;
const OP_MIN_S: f64 = 60.0;
const OP_MAX_S: f64 = 150.0;
const ED_MAX_S: f64 = 180.0;
const PREVIEW_MAX_S: f64 = 60.0;
const BODY_MIN_S: f64 = 600.0;
const BUMPER_MAX_S: f64 = 10.0;

/// Below this duration a single-item playlist in the OP/ED band is guessed
/// to be a creditless opening rather than ending.
const CREDITLESS_OP_ED_SPLIT_S: f64 = 90.0;

const LEGAL_SHARE: f64 = 0.6;
const PREFIX_SUFFIX_SHARE: f64 = 0.5;

/// Per-key occurrence statistics over the episode candidates.
struct CandidateStats {
    count: usize,
    containing: BTreeMap<SegmentKey, usize>,
    first: BTreeSet<SegmentKey>,
    prefix: BTreeMap<SegmentKey, usize>,
    suffix: BTreeMap<SegmentKey, usize>,
}

fn candidate_stats(playlists: &[Playlist], candidates: &BTreeSet<String>) -> CandidateStats {
    let mut stats = CandidateStats {
        count: 0,
        containing: BTreeMap::new(),
        first: BTreeSet::new(),
        prefix: BTreeMap::new(),
        suffix: BTreeMap::new(),
    };
    for pl in playlists {
        if !candidates.contains(&pl.mpls) || pl.play_items.is_empty() {
            continue;
        }
        stats.count += 1;

        let keys: BTreeSet<SegmentKey> =
            pl.play_items.iter().map(|pi| pi.segment_key()).collect();
        for key in keys {
            *stats.containing.entry(key).or_insert(0) += 1;
        }

        stats.first.insert(pl.play_items[0].segment_key());
        for pi in pl.play_items.iter().take(2) {
            *stats.prefix.entry(pi.segment_key()).or_insert(0) += 1;
        }
        let tail_start = pl.play_items.len().saturating_sub(2);
        for pi in &pl.play_items[tail_start..] {
            *stats.suffix.entry(pi.segment_key()).or_insert(0) += 1;
        }
    }
    stats
}

/// Assign a heuristic label to every play item.
///
/// Position statistics come from the episode candidates; the labels are
/// then applied wherever the same segment key occurs.
pub fn label_segments(
    playlists: &mut [Playlist],
    frequency: &BTreeMap<SegmentKey, usize>,
    candidates: &BTreeSet<String>,
) {
    let stats = candidate_stats(playlists, candidates);
    let n = stats.count as f64;

    for pl in playlists.iter_mut() {
        let is_candidate = candidates.contains(&pl.mpls);
        let last_index = pl.play_items.len().saturating_sub(1);
        for (index, pi) in pl.play_items.iter_mut().enumerate() {
            let key = pi.segment_key();
            let dur_s = pi.duration_seconds();
            let shared = frequency.get(&key).copied().unwrap_or(0) >= 2;
            let containing = stats.containing.get(&key).copied().unwrap_or(0) as f64;
            let prefix = stats.prefix.get(&key).copied().unwrap_or(0) as f64;
            let suffix = stats.suffix.get(&key).copied().unwrap_or(0) as f64;

            pi.label = if n > 0.0
                && dur_s <= LEGAL_MAX_S
                && shared
                && stats.first.contains(&key)
                && containing >= LEGAL_SHARE * n
            {
                SegmentLabel::Legal
            } else if n > 0.0
                && (OP_MIN_S..=OP_MAX_S).contains(&dur_s)
                && prefix >= PREFIX_SUFFIX_SHARE * n
            {
                SegmentLabel::Op
            } else if n > 0.0
                && (OP_MIN_S..=ED_MAX_S).contains(&dur_s)
                && suffix >= PREFIX_SUFFIX_SHARE * n
            {
                SegmentLabel::Ed
            } else if index == last_index && dur_s <= PREVIEW_MAX_S {
                SegmentLabel::Preview
            } else if is_candidate && dur_s >= BODY_MIN_S {
                SegmentLabel::Body
            } else {
                SegmentLabel::Unknown
            };
        }
    }
}

/// Classify every playlist. Rules are evaluated in order; the first match
/// wins.
pub fn classify_playlists(
    playlists: &[Playlist],
    alternates: &BTreeSet<String>,
    play_all: &BTreeSet<String>,
    cluster: &DurationCluster,
) -> BTreeMap<String, Classification> {
    let mut result = BTreeMap::new();
    for pl in playlists {
        let dur_s = pl.duration_seconds();
        let classification = if alternates.contains(&pl.mpls) {
            Classification::DuplicateVariant
        } else if play_all.contains(&pl.mpls) {
            Classification::PlayAll
        } else if pl.play_items.len() == 1 && dur_s <= BUMPER_MAX_S {
            Classification::Bumper
        } else if let Some(creditless) = classify_creditless(pl, dur_s) {
            creditless
        } else if cluster.contains(&pl.mpls)
            && pl.play_items.iter().any(|pi| pi.label == SegmentLabel::Body)
        {
            Classification::Episode
        } else {
            Classification::Extra
        };
        result.insert(pl.mpls.clone(), classification);
    }
    result
}

fn classify_creditless(pl: &Playlist, dur_s: f64) -> Option<Classification> {
    if pl.play_items.len() != 1 || !(OP_MIN_S..=ED_MAX_S).contains(&dur_s) {
        return None;
    }
    match pl.play_items[0].label {
        SegmentLabel::Op if dur_s <= OP_MAX_S => Some(Classification::CreditlessOp),
        SegmentLabel::Ed => Some(Classification::CreditlessEd),
        // No label signal: guess from the duration band.
        SegmentLabel::Unknown | SegmentLabel::Preview => {
            if dur_s < CREDITLESS_OP_ED_SPLIT_S {
                Some(Classification::CreditlessOp)
            } else {
                Some(Classification::CreditlessEd)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::clustering::cluster_by_duration;
    use crate::analyze::segment_graph::build_segment_frequency;
    use crate::analyze::testutil::playlist;
    use crate::bdmv::models::Playlist;

    /// Three episode-shaped playlists: shared legal + OP, unique body,
    /// shared ED, short preview.
    fn episode_set() -> Vec<Playlist> {
        let mut out = Vec::new();
        for (mpls, body) in [
            ("00010.mpls", "00007"),
            ("00011.mpls", "00008"),
            ("00012.mpls", "00009"),
        ] {
            out.push(playlist(
                mpls,
                &[
                    ("00004", 0.0, 5.0),
                    ("00005", 0.0, 90.0),
                    (body, 0.0, 1290.0),
                    ("00006", 0.0, 89.5),
                    (body, 1290.0, 1320.0),
                ],
            ));
        }
        out
    }

    fn labeled(mut playlists: Vec<Playlist>) -> Vec<Playlist> {
        let refs: Vec<&Playlist> = playlists.iter().collect();
        let freq = build_segment_frequency(&refs);
        let cluster = cluster_by_duration(&refs);
        let candidates: BTreeSet<String> = cluster.members.iter().cloned().collect();
        label_segments(&mut playlists, &freq, &candidates);
        playlists
    }

    #[test]
    fn labels_follow_position_and_frequency() {
        let playlists = labeled(episode_set());
        let labels: Vec<SegmentLabel> =
            playlists[0].play_items.iter().map(|pi| pi.label).collect();
        assert_eq!(
            labels,
            vec![
                SegmentLabel::Legal,
                SegmentLabel::Op,
                SegmentLabel::Body,
                SegmentLabel::Ed,
                SegmentLabel::Preview,
            ]
        );
    }

    #[test]
    fn unique_long_segments_outside_candidates_stay_unknown() {
        let mut playlists = episode_set();
        // A 15-minute extra far from the episode cluster.
        playlists.push(playlist("00030.mpls", &[("00020", 0.0, 900.0)]));
        let playlists = labeled(playlists);
        let extra = playlists.iter().find(|pl| pl.mpls == "00030.mpls").unwrap();
        assert_eq!(extra.play_items[0].label, SegmentLabel::Unknown);
    }

    #[test]
    fn episode_playlists_require_cluster_membership_and_body() {
        let playlists = labeled(episode_set());
        let refs: Vec<&Playlist> = playlists.iter().collect();
        let cluster = cluster_by_duration(&refs);
        let classifications = classify_playlists(
            &playlists,
            &BTreeSet::new(),
            &BTreeSet::new(),
            &cluster,
        );
        for pl in &playlists {
            assert_eq!(classifications[&pl.mpls], Classification::Episode);
        }
    }

    #[test]
    fn bumpers_and_creditless_shorts_are_separated() {
        let mut playlists = episode_set();
        playlists.push(playlist("00020.mpls", &[("00040", 0.0, 4.0)]));
        playlists.push(playlist("00021.mpls", &[("00041", 0.0, 88.0)]));
        playlists.push(playlist("00022.mpls", &[("00042", 0.0, 120.0)]));
        let playlists = labeled(playlists);
        let refs: Vec<&Playlist> = playlists.iter().collect();
        let cluster = cluster_by_duration(&refs);
        let classifications = classify_playlists(
            &playlists,
            &BTreeSet::new(),
            &BTreeSet::new(),
            &cluster,
        );
        assert_eq!(classifications["00020.mpls"], Classification::Bumper);
        assert_eq!(classifications["00021.mpls"], Classification::CreditlessOp);
        assert_eq!(classifications["00022.mpls"], Classification::CreditlessEd);
    }

    #[test]
    fn duplicate_and_play_all_rules_win_first() {
        let playlists = labeled(episode_set());
        let refs: Vec<&Playlist> = playlists.iter().collect();
        let cluster = cluster_by_duration(&refs);
        let alternates: BTreeSet<String> = ["00011.mpls".to_string()].into();
        let play_all: BTreeSet<String> = ["00012.mpls".to_string()].into();
        let classifications = classify_playlists(&playlists, &alternates, &play_all, &cluster);
        assert_eq!(
            classifications["00011.mpls"],
            Classification::DuplicateVariant
        );
        assert_eq!(classifications["00012.mpls"], Classification::PlayAll);
        assert_eq!(classifications["00010.mpls"], Classification::Episode);
    }
}
