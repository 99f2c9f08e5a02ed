use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Native Blu-ray time base: 45 000 ticks per second.
pub const TICKS_PER_MS: f64 = 45.0;

/// Quantization step for segment keys, in milliseconds.
pub const SEGMENT_QUANT_MS: f64 = 250.0;

pub fn ticks_to_ms(ticks: u32) -> f64 {
    ticks as f64 / TICKS_PER_MS
}

/// Round `ms` to the nearest multiple of `quant`.
pub fn quantize(ms: f64, quant: f64) -> f64 {
    (ms / quant).round() * quant
}

/// Stream coding types mapped from the 1-byte attribute field shared by the
/// MPLS stream number table and the CLPI program info section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Mpeg1Video,
    Mpeg2Video,
    H264,
    Hevc,
    Vc1,
    Mpeg1Audio,
    Mpeg2Audio,
    Lpcm,
    Ac3,
    Dts,
    TrueHd,
    EAc3,
    DtsHdHr,
    DtsHdMa,
    DdPlusSecondary,
    DtsHdSecondary,
    Pgs,
    Ig,
    TextSubtitle,
    Unknown(u8),
}

impl Codec {
    pub fn from_coding_type(coding_type: u8) -> Self {
        match coding_type {
            0x01 => Codec::Mpeg1Video,
            0x02 => Codec::Mpeg2Video,
            0x1B => Codec::H264,
            0x24 => Codec::Hevc,
            0xEA => Codec::Vc1,
            0x03 => Codec::Mpeg1Audio,
            0x04 => Codec::Mpeg2Audio,
            0x80 => Codec::Lpcm,
            0x81 => Codec::Ac3,
            0x82 => Codec::Dts,
            0x83 => Codec::TrueHd,
            0x84 => Codec::EAc3,
            0x85 => Codec::DtsHdHr,
            0x86 => Codec::DtsHdMa,
            0xA1 => Codec::DdPlusSecondary,
            0xA2 => Codec::DtsHdSecondary,
            0x90 => Codec::Pgs,
            0x91 => Codec::Ig,
            0x92 => Codec::TextSubtitle,
            other => Codec::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Mpeg1Video => "MPEG-1 Video",
            Codec::Mpeg2Video => "MPEG-2 Video",
            Codec::H264 => "H.264/AVC",
            Codec::Hevc => "HEVC",
            Codec::Vc1 => "VC-1",
            Codec::Mpeg1Audio => "MPEG-1 Audio",
            Codec::Mpeg2Audio => "MPEG-2 Audio",
            Codec::Lpcm => "LPCM",
            Codec::Ac3 => "AC-3",
            Codec::Dts => "DTS",
            Codec::TrueHd => "TrueHD",
            Codec::EAc3 => "E-AC-3",
            Codec::DtsHdHr => "DTS-HD HR",
            Codec::DtsHdMa => "DTS-HD MA",
            Codec::DdPlusSecondary => "DD+ Secondary",
            Codec::DtsHdSecondary => "DTS-HD Secondary",
            Codec::Pgs => "PGS",
            Codec::Ig => "IG",
            Codec::TextSubtitle => "Text Subtitle",
            Codec::Unknown(_) => "UNKNOWN",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Codec::Mpeg1Video | Codec::Mpeg2Video | Codec::H264 | Codec::Hevc | Codec::Vc1
        )
    }

    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            Codec::Mpeg1Audio
                | Codec::Mpeg2Audio
                | Codec::Lpcm
                | Codec::Ac3
                | Codec::Dts
                | Codec::TrueHd
                | Codec::EAc3
                | Codec::DtsHdHr
                | Codec::DtsHdMa
                | Codec::DdPlusSecondary
                | Codec::DtsHdSecondary
        )
    }

    /// PG / IG / text-subtitle family: carries a language tag but no
    /// audio/video format byte.
    pub fn is_graphics(&self) -> bool {
        matches!(self, Codec::Pgs | Codec::Ig | Codec::TextSubtitle)
    }

    pub fn is_subtitle(&self) -> bool {
        matches!(self, Codec::Pgs | Codec::TextSubtitle)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One elementary stream as described by a stream attribute block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// 13-bit packet identifier.
    pub pid: u16,
    /// Raw coding type byte.
    pub coding_type: u8,
    pub codec: Codec,
    /// ISO 639-2 code, empty when the stream carries none.
    pub lang: String,
}

/// Heuristic role of a segment inside an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentLabel {
    Legal,
    Op,
    Body,
    Ed,
    Preview,
    Unknown,
}

impl SegmentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentLabel::Legal => "LEGAL",
            SegmentLabel::Op => "OP",
            SegmentLabel::Body => "BODY",
            SegmentLabel::Ed => "ED",
            SegmentLabel::Preview => "PREVIEW",
            SegmentLabel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical identity of a segment reused across playlists.
///
/// In/out times are quantized to 250 ms so near-duplicate authorings with
/// sub-frame timing differences collapse onto one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey {
    pub clip_id: String,
    pub in_ms: i64,
    pub out_ms: i64,
}

impl SegmentKey {
    pub fn new(clip_id: &str, in_time_ticks: u32, out_time_ticks: u32) -> Self {
        let q = |ticks: u32| (quantize(ticks_to_ms(ticks), SEGMENT_QUANT_MS)) as i64;
        Self {
            clip_id: clip_id.to_string(),
            in_ms: q(in_time_ticks),
            out_ms: q(out_time_ticks),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.clip_id, self.in_ms, self.out_ms)
    }
}

/// One entry of a playlist: a clip reference with a time range.
#[derive(Debug, Clone)]
pub struct PlayItem {
    /// Five-digit zero-padded clip identifier.
    pub clip_id: String,
    /// Stream filename derived from the clip id.
    pub m2ts: String,
    /// In point, 45 kHz ticks.
    pub in_time: u32,
    /// Out point, 45 kHz ticks.
    pub out_time: u32,
    pub connection_condition: u8,
    pub streams: Vec<StreamInfo>,
    pub label: SegmentLabel,
}

impl PlayItem {
    pub fn duration_ticks(&self) -> u32 {
        self.out_time.saturating_sub(self.in_time)
    }

    pub fn duration_ms(&self) -> f64 {
        ticks_to_ms(self.duration_ticks())
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms() / 1000.0
    }

    pub fn segment_key(&self) -> SegmentKey {
        SegmentKey::new(&self.clip_id, self.in_time, self.out_time)
    }
}

/// Chapter mark inside a playlist, ordered by id.
#[derive(Debug, Clone)]
pub struct ChapterMark {
    pub mark_id: u16,
    pub mark_type: u8,
    pub play_item_ref: u16,
    /// Time stamp, 45 kHz ticks.
    pub timestamp: u32,
    pub entry_es_pid: u16,
    pub duration_ms: f64,
}

/// One playback program: an ordered list of play items plus chapter marks.
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Source filename, e.g. `00001.mpls`.
    pub mpls: String,
    /// Four ASCII version bytes from the header.
    pub version: String,
    pub play_items: Vec<PlayItem>,
    pub chapters: Vec<ChapterMark>,
    pub is_multi_angle: bool,
}

impl Playlist {
    pub fn duration_ticks(&self) -> u64 {
        self.play_items
            .iter()
            .map(|pi| pi.duration_ticks() as u64)
            .sum()
    }

    pub fn duration_ms(&self) -> f64 {
        self.play_items.iter().map(|pi| pi.duration_ms()).sum()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms() / 1000.0
    }

    /// Ordered (clip id, raw in, raw out) tuples, no quantization.
    pub fn signature_exact(&self) -> Vec<(String, u32, u32)> {
        self.play_items
            .iter()
            .map(|pi| (pi.clip_id.clone(), pi.in_time, pi.out_time))
            .collect()
    }

    /// Ordered quantized segment keys.
    pub fn signature_loose(&self) -> Vec<SegmentKey> {
        self.play_items.iter().map(|pi| pi.segment_key()).collect()
    }
}

/// Per-clip stream metadata from one CLPI file.
#[derive(Debug, Clone)]
pub struct ClipInfo {
    pub clip_id: String,
    pub streams: Vec<StreamInfo>,
}

/// Lookup of parsed clips keyed by clip id.
pub type ClipMap = BTreeMap<String, ClipInfo>;

/// Stable warning codes for programmatic filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    NoEpisodesFound,
    PlayAllOnly,
    LowConfidenceOrder,
    NoClpiFound,
    DuplicateVariants,
    MalformedSection,
    UnknownOpcode,
    IgScanTruncated,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::NoEpisodesFound => "NO_EPISODES_FOUND",
            WarningCode::PlayAllOnly => "PLAY_ALL_ONLY",
            WarningCode::LowConfidenceOrder => "LOW_CONFIDENCE_ORDER",
            WarningCode::NoClpiFound => "NO_CLPI_FOUND",
            WarningCode::DuplicateVariants => "DUPLICATE_VARIANTS",
            WarningCode::MalformedSection => "MALFORMED_SECTION",
            WarningCode::UnknownOpcode => "UNKNOWN_OPCODE",
            WarningCode::IgScanTruncated => "IG_SCAN_TRUNCATED",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal diagnostic attached to the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}
