use crate::analyze::classify::{classify_playlists, label_segments};
use crate::analyze::clustering::cluster_by_duration;
use crate::analyze::models::{AnalysisInfo, DiscAnalysis, DiscHints, TitleHint};
use crate::analyze::ordering::infer_episodes;
use crate::analyze::segment_graph::{build_segment_frequency, detect_play_all};
use crate::analyze::signatures::{find_duplicates, representatives};
use crate::bdmv::index::{IndexBdmv, TitleObjectType};
use crate::bdmv::models::{Warning, WarningCode};
use crate::bdmv::movie_object::MovieObjectBdmv;
use crate::bdmv::ScannedDisc;
use log::debug;
use std::collections::BTreeSet;

pub mod classify;
pub mod clustering;
pub mod explain;
pub mod models;
pub mod ordering;
pub mod segment_graph;
pub mod signatures;

#[cfg(test)]
pub(crate) mod testutil;

/// Run the full analysis pipeline over a scanned disc.
///
/// Stages run strictly forward: dedup → clustering → segment graph →
/// labels → classification → inference. Playlists are processed in
/// filename order, so the result is deterministic for identical inputs.
pub fn scan_disc(scanned: ScannedDisc) -> DiscAnalysis {
    let ScannedDisc {
        path,
        mut playlists,
        clips,
        index,
        movie_objects,
        ig_chapter_marks,
        mut warnings,
    } = scanned;

    playlists.sort_by(|a, b| a.mpls.cmp(&b.mpls));

    let hints = build_hints(index.as_ref(), movie_objects.as_ref(), ig_chapter_marks);

    let dedup_groups = find_duplicates(&playlists, &clips);
    if !dedup_groups.is_empty() {
        warnings.push(
            Warning::new(
                WarningCode::DuplicateVariants,
                format!(
                    "{} group(s) of near-duplicate playlists",
                    dedup_groups.len()
                ),
            )
            .with_context(
                "groups",
                dedup_groups
                    .iter()
                    .map(|g| g.representative.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        );
    }
    let alternates: BTreeSet<String> = dedup_groups
        .iter()
        .flat_map(|g| g.alternates.iter().cloned())
        .collect();

    let (cluster, frequency, play_all) = {
        let reps = representatives(&playlists, &dedup_groups);
        let cluster = cluster_by_duration(&reps);
        let frequency = build_segment_frequency(&reps);
        let play_all = detect_play_all(&reps);
        (cluster, frequency, play_all)
    };
    debug!(
        "{} episode-length candidate(s), {} play-all candidate(s)",
        cluster.members.len(),
        play_all.len()
    );

    let candidates: BTreeSet<String> = cluster.members.iter().cloned().collect();
    label_segments(&mut playlists, &frequency, &candidates);

    let play_all_names: BTreeSet<String> = play_all.iter().map(|c| c.mpls.clone()).collect();
    let classifications = classify_playlists(&playlists, &alternates, &play_all_names, &cluster);

    let episodes = infer_episodes(
        &playlists,
        &classifications,
        &dedup_groups,
        &play_all,
        &hints,
        &mut warnings,
    );

    DiscAnalysis {
        path,
        playlists,
        clips,
        episodes,
        warnings,
        analysis: AnalysisInfo {
            classifications,
            play_all: play_all_names.into_iter().collect(),
            duplicate_groups: dedup_groups
                .iter()
                .map(|g| {
                    let mut group = vec![g.representative.clone()];
                    group.extend(g.alternates.iter().cloned());
                    group
                })
                .collect(),
            hints,
        },
    }
}

/// Combine the title index, movie objects and menu scan into inference
/// hints.
fn build_hints(
    index: Option<&IndexBdmv>,
    movie_objects: Option<&MovieObjectBdmv>,
    ig_chapter_marks: Vec<u32>,
) -> DiscHints {
    let mut titles = Vec::new();
    if let (Some(index), Some(mobj)) = (index, movie_objects) {
        for title in &index.titles {
            if title.object_type != TitleObjectType::Hdmv {
                continue;
            }
            let playlists: Vec<String> = mobj
                .objects
                .get(title.movie_object_id as usize)
                .map(|obj| {
                    obj.referenced_playlists()
                        .into_iter()
                        .map(|stem| format!("{stem}.mpls"))
                        .collect()
                })
                .unwrap_or_default();
            if !playlists.is_empty() {
                titles.push(TitleHint {
                    title_number: title.title_number,
                    movie_object_id: title.movie_object_id,
                    playlists,
                });
            }
        }
    }
    DiscHints {
        titles,
        ig_chapter_marks,
    }
}
