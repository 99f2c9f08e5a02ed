use crate::analyze::models::DiscAnalysis;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Format milliseconds as `H:MM:SS` or `MM:SS`.
pub fn format_duration(ms: f64) -> String {
    let total_seconds = (ms / 1000.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Render a deterministic, human-auditable account of the analysis.
///
/// Pure rendering: no decisions are taken here.
pub fn explain_disc(analysis: &DiscAnalysis) -> String {
    let mut out = String::new();

    let clip_ids: BTreeSet<&str> = analysis
        .playlists
        .iter()
        .flat_map(|pl| pl.play_items.iter().map(|pi| pi.clip_id.as_str()))
        .collect();

    let _ = writeln!(out, "Disc: {}", analysis.path.display());
    let _ = writeln!(out, "Playlists: {}", analysis.playlists.len());
    let _ = writeln!(out, "Clips:     {}", clip_ids.len());
    out.push('\n');

    if !analysis.playlists.is_empty() {
        let _ = writeln!(out, "Playlist classification:");
        for pl in &analysis.playlists {
            let classification = analysis
                .classification(&pl.mpls)
                .map(|c| c.as_str())
                .unwrap_or("unknown");
            let _ = writeln!(
                out,
                "  {:<14} {:>9}  {:>2} item(s)  {}",
                pl.mpls,
                format_duration(pl.duration_ms()),
                pl.play_items.len(),
                classification,
            );
        }
        out.push('\n');
    }

    if !analysis.episodes.is_empty() {
        let _ = writeln!(out, "Episodes found: {}", analysis.episodes.len());
        for ep in &analysis.episodes {
            let clips: Vec<&str> = ep.segments.iter().map(|s| s.clip_id.as_str()).collect();
            let _ = writeln!(
                out,
                "  Episode {:>2}: {:>9}  confidence={:.2}  playlist={}  clips=[{}]",
                ep.episode,
                format_duration(ep.duration_ms),
                ep.confidence,
                ep.playlist,
                clips.join(", "),
            );
            if !ep.alternates.is_empty() {
                let _ = writeln!(out, "              alternates: {}", ep.alternates.join(", "));
            }
        }
        out.push('\n');
    }

    if !analysis.analysis.duplicate_groups.is_empty() {
        let _ = writeln!(out, "Duplicate playlist groups:");
        for group in &analysis.analysis.duplicate_groups {
            let _ = writeln!(out, "  {}", group.join(", "));
        }
        out.push('\n');
    }

    if !analysis.analysis.play_all.is_empty() {
        let _ = writeln!(
            out,
            "Play-all playlists: {}",
            analysis.analysis.play_all.join(", ")
        );
        out.push('\n');
    }

    let hints = &analysis.analysis.hints;
    if !hints.titles.is_empty() || !hints.ig_chapter_marks.is_empty() {
        let _ = writeln!(out, "Navigation hints:");
        for title in &hints.titles {
            let _ = writeln!(
                out,
                "  Title {:>2} -> {} (movie object {})",
                title.title_number,
                title.playlists.join(", "),
                title.movie_object_id,
            );
        }
        if !hints.ig_chapter_marks.is_empty() {
            let marks: Vec<String> = hints
                .ig_chapter_marks
                .iter()
                .map(|m| m.to_string())
                .collect();
            let _ = writeln!(out, "  IG menu chapter marks: [{}]", marks.join(", "));
        }
        out.push('\n');
    }

    if !analysis.warnings.is_empty() {
        let _ = writeln!(out, "Warnings:");
        for warning in &analysis.warnings {
            let _ = writeln!(out, "  [{}] {}", warning.code, warning.message);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_format_both_ranges() {
        assert_eq!(format_duration(83_000.0), "01:23");
        assert_eq!(format_duration(5_025_000.0), "1:23:45");
        assert_eq!(format_duration(0.0), "00:00");
    }

    #[test]
    fn empty_analysis_renders_header_only() {
        let report = explain_disc(&DiscAnalysis::default());
        assert!(report.starts_with("Disc: "));
        assert!(report.contains("Playlists: 0"));
        assert!(!report.contains("Episodes found"));
    }
}
