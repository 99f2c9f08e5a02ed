use crate::analyze::models::DiscAnalysis;
use crate::bdmv::models::ticks_to_ms;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write one `.m3u` debug playlist per inferred episode.
///
/// Each segment becomes an EXTINF entry referencing the source m2ts with
/// VLC start/stop options. Players normalize m2ts timestamps to start at
/// zero, so seek positions are relative to the clip's base PTS (the
/// earliest in-time seen for that clip on the disc).
pub fn export_m3u(analysis: &DiscAnalysis, out_dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let stream_dir = analysis.path.join("STREAM");

    let mut clip_pts_base: BTreeMap<&str, f64> = BTreeMap::new();
    for pl in &analysis.playlists {
        for pi in &pl.play_items {
            let in_ms = ticks_to_ms(pi.in_time);
            clip_pts_base
                .entry(pi.clip_id.as_str())
                .and_modify(|base| *base = base.min(in_ms))
                .or_insert(in_ms);
        }
    }

    let mut created = Vec::new();
    for ep in &analysis.episodes {
        let mut content = String::from("#EXTM3U\n");
        for seg in &ep.segments {
            let duration_s = seg.duration_ms / 1000.0;
            let base_ms = clip_pts_base
                .get(seg.clip_id.as_str())
                .copied()
                .unwrap_or(seg.in_ms);
            let start_s = (seg.in_ms - base_ms) / 1000.0;
            let stop_s = start_s + duration_s;

            let _ = writeln!(
                content,
                "#EXTINF:{duration_s:.3},{} ({})",
                seg.clip_id, seg.label
            );
            if start_s > 0.5 {
                let _ = writeln!(content, "#EXTVLCOPT:start-time={start_s:.3}");
                let _ = writeln!(content, "#EXTVLCOPT:stop-time={stop_s:.3}");
            }
            let _ = writeln!(
                content,
                "{}",
                stream_dir.join(format!("{}.m2ts", seg.clip_id)).display()
            );
        }

        let path = out_dir.join(format!("Episode_{:02}.m3u", ep.episode));
        fs::write(&path, content)?;
        created.push(path);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::scan_disc;
    use crate::analyze::testutil::playlist;
    use crate::bdmv::ScannedDisc;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bdscan-m3u-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_analysis() -> DiscAnalysis {
        scan_disc(ScannedDisc {
            path: "/discs/demo/BDMV".into(),
            playlists: vec![
                playlist("00010.mpls", &[("00007", 0.0, 1440.0)]),
                playlist("00011.mpls", &[("00008", 0.0, 1444.0)]),
            ],
            ..ScannedDisc::default()
        })
    }

    #[test]
    fn writes_one_file_per_episode() {
        let out = temp_dir("count");
        let created = export_m3u(&sample_analysis(), &out).unwrap();
        assert_eq!(created.len(), 2);
        assert!(created[0].ends_with("Episode_01.m3u"));
        let content = fs::read_to_string(&created[0]).unwrap();
        assert!(content.starts_with("#EXTM3U"));
        assert!(content.contains("00007.m2ts"));
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn no_episodes_creates_no_files() {
        let out = temp_dir("empty");
        let analysis = scan_disc(ScannedDisc {
            path: "/discs/demo/BDMV".into(),
            ..ScannedDisc::default()
        });
        let created = export_m3u(&analysis, &out).unwrap();
        assert!(created.is_empty());
        let _ = fs::remove_dir_all(&out);
    }
}
