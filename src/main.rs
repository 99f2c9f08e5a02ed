use crate::analyze::explain::{explain_disc, format_duration};
use crate::analyze::models::DiscAnalysis;
use crate::bdmv::{resolve_bdmv_root, scan_bdmv};
use crate::commands::{Cli, Commands, ExplainCommand, PlaylistCommand, ScanCommand};
use crate::error::BdscanError;
use crate::export::{export_json, export_m3u};
use anyhow::Result;
use clap::Parser;
use indicatif::MultiProgress;
use log::{info, warn};
use std::path::Path;

mod analyze;
mod bdmv;
mod commands;
mod error;
mod export;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(cmd) => run_scan(cmd).await?,
        Commands::Explain(cmd) => run_explain(cmd).await?,
        Commands::Playlist(cmd) => run_playlist(cmd).await?,
    }

    Ok(())
}

async fn analyze_disc(path: &Path) -> Result<DiscAnalysis> {
    let root = resolve_bdmv_root(path)?;
    let pb = MultiProgress::new();
    let scanned = scan_bdmv(pb, &root).await?;
    Ok(analyze::scan_disc(scanned))
}

async fn run_scan(cmd: ScanCommand) -> Result<()> {
    let analysis = analyze_disc(&cmd.bdmv).await?;
    let json = export_json(&analysis, !cmd.compact)?;
    match cmd.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &json).await?;
            info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn run_explain(cmd: ExplainCommand) -> Result<()> {
    let analysis = analyze_disc(&cmd.bdmv).await?;

    let Some(name) = cmd.playlist else {
        print!("{}", explain_disc(&analysis));
        return Ok(());
    };

    let playlist = analysis
        .playlist(&name)
        .or_else(|| analysis.playlist(&format!("{name}.mpls")))
        .ok_or(BdscanError::PlaylistNotFound(name))?;

    println!("Playlist: {}", playlist.mpls);
    println!("Duration: {}", format_duration(playlist.duration_ms()));
    println!("Items:    {}", playlist.play_items.len());
    println!("Chapters: {}", playlist.chapters.len());
    let classification = analysis
        .classification(&playlist.mpls)
        .map(|c| c.as_str())
        .unwrap_or("unknown");
    println!("Class:    {classification}");
    println!();
    for (index, pi) in playlist.play_items.iter().enumerate() {
        println!(
            "  [{index}] {} ({})  {}  [{}]",
            pi.clip_id,
            pi.m2ts,
            format_duration(pi.duration_ms()),
            pi.label,
        );
    }
    Ok(())
}

async fn run_playlist(cmd: PlaylistCommand) -> Result<()> {
    let analysis = analyze_disc(&cmd.bdmv).await?;
    let created = export_m3u(&analysis, &cmd.out)?;
    for path in &created {
        info!("Created {}", path.display());
    }
    if created.is_empty() {
        warn!("No episodes found; no playlists generated");
    }
    Ok(())
}
