use crate::bdmv::models::Playlist;
use std::collections::BTreeMap;

/// Playlists shorter than this are extras, never episodes.
pub const SHORT_THRESHOLD_MS: f64 = 180_000.0;

const MIN_BUCKET_WIDTH_MS: f64 = 30_000.0;

/// The dominant episode-length cluster.
#[derive(Debug, Clone, Default)]
pub struct DurationCluster {
    /// Member playlist filenames, input order preserved.
    pub members: Vec<String>,
    pub mean_duration_ms: f64,
    pub bucket_width_ms: f64,
}

impl DurationCluster {
    pub fn contains(&self, mpls: &str) -> bool {
        self.members.iter().any(|m| m == mpls)
    }
}

/// Histogram representative playlists by duration and pick the dominant
/// bucket as the episode-length candidate set.
///
/// Bucket width is `max(30 s, 5% of the median duration)`; ties between
/// buckets break on total duration, then mean, then the lower bucket.
pub fn cluster_by_duration(representatives: &[&Playlist]) -> DurationCluster {
    let eligible: Vec<&Playlist> = representatives
        .iter()
        .copied()
        .filter(|pl| pl.duration_ms() >= SHORT_THRESHOLD_MS)
        .collect();
    if eligible.is_empty() {
        return DurationCluster::default();
    }

    let mut durations: Vec<f64> = eligible.iter().map(|pl| pl.duration_ms()).collect();
    durations.sort_by(|a, b| a.total_cmp(b));
    let median = durations[durations.len() / 2];
    let width = MIN_BUCKET_WIDTH_MS.max(median * 0.05);

    // Bins are centered on the median so the dominant cluster cannot be
    // split across a bucket edge.
    let mut buckets: BTreeMap<i64, Vec<&Playlist>> = BTreeMap::new();
    for pl in &eligible {
        let bucket = ((pl.duration_ms() - median) / width).round() as i64;
        buckets.entry(bucket).or_default().push(pl);
    }

    let mut best: Option<(usize, f64, i64, &Vec<&Playlist>)> = None;
    for (bucket, members) in &buckets {
        let total: f64 = members.iter().map(|pl| pl.duration_ms()).sum();
        let better = match &best {
            None => true,
            Some((count, best_total, best_bucket, _)) => {
                members.len() > *count
                    || (members.len() == *count && total > *best_total)
                    || (members.len() == *count && total == *best_total && bucket < best_bucket)
            }
        };
        if better {
            best = Some((members.len(), total, *bucket, members));
        }
    }

    match best {
        Some((count, total, _, members)) => DurationCluster {
            members: members.iter().map(|pl| pl.mpls.clone()).collect(),
            mean_duration_ms: total / count as f64,
            bucket_width_ms: width,
        },
        None => DurationCluster::default(),
    }
}
