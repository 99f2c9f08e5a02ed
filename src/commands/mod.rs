use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for analyzing BDMV disc backups and inferring episode structure.
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Scan(ScanCommand),
    Explain(ExplainCommand),
    Playlist(PlaylistCommand),
}

/// Detects episode playlists and emits the structured JSON document.
#[derive(Parser, Debug, Clone)]
pub struct ScanCommand {
    /// Path to the BDMV directory (or a parent containing BDMV/)
    #[arg(value_name = "BDMV")]
    pub bdmv: PathBuf,

    /// Write the JSON document to this file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

/// Explains how playlists were classified and episodes chosen.
#[derive(Parser, Debug, Clone)]
pub struct ExplainCommand {
    /// Path to the BDMV directory (or a parent containing BDMV/)
    #[arg(value_name = "BDMV")]
    pub bdmv: PathBuf,

    /// Show the per-item breakdown of one playlist
    #[arg(long, short = 'p', value_name = "NAME")]
    pub playlist: Option<String>,
}

/// Writes one .m3u debug playlist per inferred episode.
#[derive(Parser, Debug, Clone)]
pub struct PlaylistCommand {
    /// Path to the BDMV directory (or a parent containing BDMV/)
    #[arg(value_name = "BDMV")]
    pub bdmv: PathBuf,

    /// Output directory for the generated playlists
    #[arg(long, default_value = "./Playlists")]
    pub out: PathBuf,
}
