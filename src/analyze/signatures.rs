use crate::bdmv::models::{ClipMap, Playlist, SegmentKey};
use std::collections::BTreeMap;

/// Playlists sharing one loose signature, with the preferred variant
/// promoted to representative.
#[derive(Debug, Clone)]
pub struct DedupGroup {
    pub representative: String,
    pub alternates: Vec<String>,
}

/// Group near-duplicate playlists (equal loose signatures).
///
/// Within each group the representative is chosen by audio stream count,
/// then subtitle stream count, then presence of chapters, then the lower
/// filename. Groups are ordered by representative name.
pub fn find_duplicates(playlists: &[Playlist], clips: &ClipMap) -> Vec<DedupGroup> {
    let mut by_signature: BTreeMap<Vec<SegmentKey>, Vec<&Playlist>> = BTreeMap::new();
    for pl in playlists {
        if pl.play_items.is_empty() {
            continue;
        }
        by_signature.entry(pl.signature_loose()).or_default().push(pl);
    }

    let mut groups: Vec<DedupGroup> = by_signature
        .into_values()
        .filter(|members| members.len() >= 2)
        .map(|members| {
            let representative = pick_representative(&members, clips).mpls.clone();
            let alternates = members
                .iter()
                .map(|pl| pl.mpls.clone())
                .filter(|mpls| *mpls != representative)
                .collect();
            DedupGroup {
                representative,
                alternates,
            }
        })
        .collect();
    groups.sort_by(|a, b| a.representative.cmp(&b.representative));
    groups
}

fn pick_representative<'a>(members: &[&'a Playlist], clips: &ClipMap) -> &'a Playlist {
    members
        .iter()
        .copied()
        .max_by(|a, b| score(a, clips).cmp(&score(b, clips)))
        .expect("dedup groups have at least two members")
}

/// Lexicographic preference: audio streams, subtitle streams, chapters,
/// then the lower filename.
fn score<'a>(pl: &'a Playlist, clips: &ClipMap) -> (usize, usize, bool, std::cmp::Reverse<&'a str>) {
    let streams: Vec<_> = match pl.play_items.first() {
        Some(pi) if !pi.streams.is_empty() => pi.streams.iter().collect(),
        Some(pi) => clips
            .get(&pi.clip_id)
            .map(|clip| clip.streams.iter().collect())
            .unwrap_or_default(),
        None => Vec::new(),
    };
    let audio = streams.iter().filter(|s| s.codec.is_audio()).count();
    let subtitles = streams.iter().filter(|s| s.codec.is_subtitle()).count();
    (
        audio,
        subtitles,
        !pl.chapters.is_empty(),
        std::cmp::Reverse(pl.mpls.as_str()),
    )
}

/// Playlists that are not shadowed as duplicate alternates, input order
/// preserved.
pub fn representatives<'a>(playlists: &'a [Playlist], groups: &[DedupGroup]) -> Vec<&'a Playlist> {
    let shadowed: std::collections::BTreeSet<&str> = groups
        .iter()
        .flat_map(|g| g.alternates.iter().map(String::as_str))
        .collect();
    playlists
        .iter()
        .filter(|pl| !shadowed.contains(pl.mpls.as_str()))
        .collect()
}
