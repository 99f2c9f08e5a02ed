use crate::bdmv::models::{Playlist, SegmentKey};
use std::collections::{BTreeMap, BTreeSet};

const LONG_ITEM_MIN_S: f64 = 600.0;

/// Count how often each segment key appears across the given playlists.
pub fn build_segment_frequency(playlists: &[&Playlist]) -> BTreeMap<SegmentKey, usize> {
    let mut freq = BTreeMap::new();
    for pl in playlists {
        for pi in &pl.play_items {
            *freq.entry(pi.segment_key()).or_insert(0) += 1;
        }
    }
    freq
}

/// A playlist whose play items concatenate other playlists' content.
#[derive(Debug, Clone)]
pub struct PlayAllCandidate {
    pub mpls: String,
    /// Playlists whose loose signatures appear inside this one.
    pub covered: Vec<String>,
}

/// Whether `candidate` appears as a contiguous run inside `play_all`,
/// tolerating at most one skipped element on either side.
pub fn is_covered_by(play_all: &[SegmentKey], candidate: &[SegmentKey]) -> bool {
    if candidate.is_empty() || play_all.len() < candidate.len().saturating_sub(1) {
        return false;
    }
    (0..play_all.len()).any(|start| matches_run(play_all, candidate, start))
}

fn matches_run(play_all: &[SegmentKey], candidate: &[SegmentKey], start: usize) -> bool {
    let mut skipped = false;
    let mut i = start;
    let mut j = 0;
    while j < candidate.len() {
        if i < play_all.len() && play_all[i] == candidate[j] {
            i += 1;
            j += 1;
            continue;
        }
        // A two-element candidate with one element skipped degenerates to
        // a single shared segment; demand an exact run there.
        if skipped || candidate.len() < 3 {
            return false;
        }
        skipped = true;
        if i < play_all.len() && j + 1 < candidate.len() && play_all[i] == candidate[j + 1] {
            // Candidate element missing from the play-all run.
            j += 1;
        } else if i + 1 < play_all.len() && play_all[i + 1] == candidate[j] {
            // Extra element inserted into the play-all run.
            i += 1;
        } else if j == candidate.len() - 1 {
            // Trailing candidate element missing.
            j += 1;
        } else {
            return false;
        }
    }
    true
}

/// Detect play-all playlists among the representatives.
///
/// A playlist qualifies when it covers at least two other playlists, or
/// concatenates at least two segments that also stand alone as single-item
/// playlists, or carries at least two episode-length play items.
pub fn detect_play_all(representatives: &[&Playlist]) -> Vec<PlayAllCandidate> {
    if representatives.len() < 2 {
        return Vec::new();
    }

    let signatures: BTreeMap<&str, Vec<SegmentKey>> = representatives
        .iter()
        .map(|pl| (pl.mpls.as_str(), pl.signature_loose()))
        .collect();

    let standalone: BTreeSet<&SegmentKey> = representatives
        .iter()
        .filter(|pl| pl.play_items.len() == 1)
        .flat_map(|pl| signatures[pl.mpls.as_str()].iter())
        .collect();

    let mut result = Vec::new();
    for pl in representatives {
        if pl.play_items.len() < 2 {
            continue;
        }
        let own = &signatures[pl.mpls.as_str()];

        let covered: Vec<String> = representatives
            .iter()
            .filter(|other| other.mpls != pl.mpls && !other.play_items.is_empty())
            .filter(|other| is_covered_by(own, &signatures[other.mpls.as_str()]))
            .map(|other| other.mpls.clone())
            .collect();

        let standalone_hits = own.iter().filter(|key| standalone.contains(key)).count();
        let long_items = pl
            .play_items
            .iter()
            .filter(|pi| pi.duration_seconds() >= LONG_ITEM_MIN_S)
            .count();

        if covered.len() >= 2 || standalone_hits >= 2 || long_items >= 2 {
            result.push(PlayAllCandidate {
                mpls: pl.mpls.clone(),
                covered,
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::testutil::playlist;

    #[test]
    fn frequency_counts_span_playlists() {
        let playlists = vec![
            playlist("00001.mpls", &[("00005", 0.0, 90.0), ("00007", 0.0, 1400.0)]),
            playlist("00002.mpls", &[("00005", 0.0, 90.0), ("00008", 0.0, 1400.0)]),
        ];
        let refs: Vec<&Playlist> = playlists.iter().collect();
        let freq = build_segment_frequency(&refs);
        let op_key = playlists[0].play_items[0].segment_key();
        let body_key = playlists[0].play_items[1].segment_key();
        assert_eq!(freq[&op_key], 2);
        assert_eq!(freq[&body_key], 1);
    }

    #[test]
    fn contiguous_subsequence_is_covered() {
        let pa = playlist(
            "00002.mpls",
            &[
                ("00005", 0.0, 90.0),
                ("00007", 0.0, 1400.0),
                ("00006", 0.0, 90.0),
                ("00008", 0.0, 1400.0),
            ],
        );
        let q = playlist("00010.mpls", &[("00007", 0.0, 1400.0), ("00006", 0.0, 90.0)]);
        assert!(is_covered_by(&pa.signature_loose(), &q.signature_loose()));
    }

    #[test]
    fn one_missing_segment_is_tolerated() {
        let pa = playlist(
            "00002.mpls",
            &[("00007", 0.0, 1400.0), ("00008", 0.0, 1400.0)],
        );
        let q = playlist(
            "00010.mpls",
            &[
                ("00007", 0.0, 1400.0),
                ("00005", 0.0, 90.0),
                ("00008", 0.0, 1400.0),
            ],
        );
        assert!(is_covered_by(&pa.signature_loose(), &q.signature_loose()));
    }

    #[test]
    fn two_missing_segments_are_not_tolerated() {
        let pa = playlist("00002.mpls", &[("00007", 0.0, 1400.0)]);
        let q = playlist(
            "00010.mpls",
            &[
                ("00005", 0.0, 90.0),
                ("00007", 0.0, 1400.0),
                ("00006", 0.0, 90.0),
            ],
        );
        assert!(!is_covered_by(&pa.signature_loose(), &q.signature_loose()));
    }

    #[test]
    fn out_of_order_segments_are_not_covered() {
        let pa = playlist(
            "00002.mpls",
            &[("00007", 0.0, 1400.0), ("00008", 0.0, 1400.0)],
        );
        let q = playlist(
            "00010.mpls",
            &[("00008", 0.0, 1400.0), ("00007", 0.0, 1400.0)],
        );
        assert!(!is_covered_by(&pa.signature_loose(), &q.signature_loose()));
    }

    #[test]
    fn concatenation_of_episodes_is_detected() {
        let ep1 = playlist("00010.mpls", &[("00005", 0.0, 90.0), ("00007", 0.0, 1400.0)]);
        let ep2 = playlist("00011.mpls", &[("00005", 0.0, 90.0), ("00008", 0.0, 1400.0)]);
        let pa = playlist(
            "00002.mpls",
            &[
                ("00005", 0.0, 90.0),
                ("00007", 0.0, 1400.0),
                ("00005", 0.0, 90.0),
                ("00008", 0.0, 1400.0),
            ],
        );
        let all = vec![pa, ep1, ep2];
        let refs: Vec<&Playlist> = all.iter().collect();
        let detected = detect_play_all(&refs);
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].mpls, "00002.mpls");
        assert_eq!(detected[0].covered.len(), 2);
    }

    #[test]
    fn multiple_long_items_alone_qualify() {
        let pa = playlist(
            "00002.mpls",
            &[
                ("00013", 0.0, 1560.0),
                ("00014", 0.0, 1575.0),
                ("00015", 0.0, 1636.0),
            ],
        );
        let bumper = playlist("00009.mpls", &[("00030", 0.0, 5.0)]);
        let all = vec![pa, bumper];
        let refs: Vec<&Playlist> = all.iter().collect();
        let detected = detect_play_all(&refs);
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].mpls, "00002.mpls");
        assert!(detected[0].covered.is_empty());
    }
}
