use crate::bdmv::models::{ClipMap, Playlist, SegmentKey, SegmentLabel, Warning};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A resolved reference to one segment of an episode.
#[derive(Debug, Clone)]
pub struct SegmentRef {
    pub key: SegmentKey,
    pub clip_id: String,
    pub in_ms: f64,
    pub out_ms: f64,
    pub duration_ms: f64,
    pub label: SegmentLabel,
}

/// One inferred episode.
#[derive(Debug, Clone)]
pub struct Episode {
    /// 1-based episode number in inferred order.
    pub episode: u32,
    /// Representative playlist filename.
    pub playlist: String,
    pub duration_ms: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub segments: Vec<SegmentRef>,
    /// Near-duplicate playlists carrying the same content.
    pub alternates: Vec<String>,
}

/// Category assigned to each playlist by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Episode,
    PlayAll,
    Bumper,
    CreditlessOp,
    CreditlessEd,
    Extra,
    DuplicateVariant,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Episode => "episode",
            Classification::PlayAll => "play_all",
            Classification::Bumper => "bumper",
            Classification::CreditlessOp => "creditless_op",
            Classification::CreditlessEd => "creditless_ed",
            Classification::Extra => "extra",
            Classification::DuplicateVariant => "duplicate_variant",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title → playlist mapping recovered from the navigation tables.
#[derive(Debug, Clone)]
pub struct TitleHint {
    pub title_number: u16,
    pub movie_object_id: u16,
    /// Playlist filenames the title's movie object plays.
    pub playlists: Vec<String>,
}

/// Navigation hints feeding the episode inference.
#[derive(Debug, Clone, Default)]
pub struct DiscHints {
    pub titles: Vec<TitleHint>,
    /// Chapter-mark numbers referenced by menu buttons, sorted.
    pub ig_chapter_marks: Vec<u32>,
}

impl DiscHints {
    /// Whether any title points at the given playlist.
    pub fn title_references(&self, mpls: &str) -> bool {
        self.titles
            .iter()
            .any(|t| t.playlists.iter().any(|p| p == mpls))
    }
}

/// Intermediate analysis results kept for the output document.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInfo {
    pub classifications: BTreeMap<String, Classification>,
    pub play_all: Vec<String>,
    pub duplicate_groups: Vec<Vec<String>>,
    pub hints: DiscHints,
}

/// The aggregate result of one disc scan.
#[derive(Debug, Clone, Default)]
pub struct DiscAnalysis {
    pub path: PathBuf,
    /// All parsed playlists, sorted by filename.
    pub playlists: Vec<Playlist>,
    pub clips: ClipMap,
    pub episodes: Vec<Episode>,
    pub warnings: Vec<Warning>,
    pub analysis: AnalysisInfo,
}

impl DiscAnalysis {
    pub fn playlist(&self, mpls: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|pl| pl.mpls == mpls)
    }

    pub fn classification(&self, mpls: &str) -> Option<Classification> {
        self.analysis.classifications.get(mpls).copied()
    }
}
