use crate::bdmv::clpi::parse_clpi;
use crate::bdmv::ig_stream::{
    extract_button_actions, ig_chapter_marks, scan_ig_stream, MAX_SCAN_BYTES,
};
use crate::bdmv::index::{parse_index, IndexBdmv};
use crate::bdmv::models::{ClipMap, Codec, Playlist, Warning, WarningCode};
use crate::bdmv::movie_object::{parse_movie_object, MovieObjectBdmv};
use crate::bdmv::mpls::parse_mpls;
use crate::error::{BdscanError, BdscanResult};
use indicatif::{MultiProgress, ProgressBar};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

pub mod clpi;
pub mod error;
pub mod ig_stream;
pub mod index;
pub mod models;
pub mod movie_object;
pub mod mpls;
pub mod reader;

/// Everything read off the disc, before analysis.
#[derive(Debug, Clone, Default)]
pub struct ScannedDisc {
    pub path: PathBuf,
    pub playlists: Vec<Playlist>,
    pub clips: ClipMap,
    pub index: Option<IndexBdmv>,
    pub movie_objects: Option<MovieObjectBdmv>,
    /// Chapter-mark numbers referenced by menu buttons, sorted.
    pub ig_chapter_marks: Vec<u32>,
    pub warnings: Vec<Warning>,
}

/// Resolve the argument to the actual BDMV directory.
///
/// Accepts the BDMV directory itself (contains PLAYLIST/) or a parent
/// directory containing BDMV/PLAYLIST/.
pub fn resolve_bdmv_root(path: &Path) -> BdscanResult<PathBuf> {
    if path.join("PLAYLIST").is_dir() {
        return Ok(path.to_path_buf());
    }
    let nested = path.join("BDMV");
    if nested.join("PLAYLIST").is_dir() {
        return Ok(nested);
    }
    Err(BdscanError::BdmvRootNotFound(path.to_path_buf()))
}

/// Read and parse every metadata file of a BDMV directory.
///
/// Parsers run over fully read buffers; unparseable files are skipped with
/// a warning so a single corrupt playlist never aborts the scan.
pub async fn scan_bdmv(pb: MultiProgress, bdmv_path: &Path) -> BdscanResult<ScannedDisc> {
    let mut warnings = Vec::new();

    let playlists = read_playlists(&pb, &bdmv_path.join("PLAYLIST"), &mut warnings).await?;
    info!("Parsed {} playlist(s)", playlists.len());

    let clips = read_clips(&bdmv_path.join("CLIPINF")).await?;
    if clips.is_empty() {
        warnings.push(Warning::new(
            WarningCode::NoClpiFound,
            "no readable clip information files in CLIPINF/",
        ));
    }

    let index = match fs::read(bdmv_path.join("index.bdmv")).await {
        Ok(data) => match parse_index(&data) {
            Ok(index) => Some(index),
            Err(e) => {
                debug!("index.bdmv unreadable: {e}");
                None
            }
        },
        Err(_) => None,
    };

    let movie_objects = match fs::read(bdmv_path.join("MovieObject.bdmv")).await {
        Ok(data) => match parse_movie_object(&data, &mut warnings) {
            Ok(mobj) => Some(mobj),
            Err(e) => {
                debug!("MovieObject.bdmv unreadable: {e}");
                None
            }
        },
        Err(_) => None,
    };

    let ig_chapter_marks = scan_menu_streams(&pb, bdmv_path, &clips, &mut warnings).await;

    Ok(ScannedDisc {
        path: bdmv_path.to_path_buf(),
        playlists,
        clips,
        index,
        movie_objects,
        ig_chapter_marks,
        warnings,
    })
}

/// Filenames with the given extension, sorted lexicographically.
async fn list_files(dir: &Path, extension: &str) -> BdscanResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(paths),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

async fn read_playlists(
    pb: &MultiProgress,
    playlist_dir: &Path,
    warnings: &mut Vec<Warning>,
) -> BdscanResult<Vec<Playlist>> {
    let paths = list_files(playlist_dir, "mpls").await?;
    let bar = pb.add(ProgressBar::new(paths.len() as u64));
    bar.set_message("Parsing playlists");

    let mut playlists = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let data = fs::read(path).await?;
        match parse_mpls(&data, &name, warnings) {
            Ok(playlist) => playlists.push(playlist),
            Err(e) => {
                warn!("Skipping unparseable playlist {name}: {e}");
                warnings.push(
                    Warning::new(
                        WarningCode::MalformedSection,
                        format!("skipping unparseable playlist: {e}"),
                    )
                    .with_context("file", &name),
                );
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(playlists)
}

async fn read_clips(clipinf_dir: &Path) -> BdscanResult<ClipMap> {
    let mut clips = ClipMap::new();
    for path in list_files(clipinf_dir, "clpi").await? {
        let clip_id = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let data = fs::read(&path).await?;
        match parse_clpi(&data, &clip_id) {
            Ok(clip) => {
                clips.insert(clip.clip_id.clone(), clip);
            }
            Err(e) => {
                warn!("Skipping unparseable clip info {clip_id}: {e}");
            }
        }
    }
    Ok(clips)
}

/// Scan menu streams for interactive compositions.
///
/// Candidates are clips whose CLPI advertises an IG stream; only a bounded
/// prefix of each m2ts is read.
async fn scan_menu_streams(
    pb: &MultiProgress,
    bdmv_path: &Path,
    clips: &ClipMap,
    warnings: &mut Vec<Warning>,
) -> Vec<u32> {
    let stream_dir = bdmv_path.join("STREAM");
    let candidates: Vec<&str> = clips
        .values()
        .filter(|clip| {
            clip.streams
                .iter()
                .any(|s| matches!(s.codec, Codec::Ig))
        })
        .map(|clip| clip.clip_id.as_str())
        .collect();

    if candidates.is_empty() || !stream_dir.is_dir() {
        return Vec::new();
    }

    let bar = pb.add(ProgressBar::new(candidates.len() as u64));
    bar.set_message("Scanning menu streams");

    let mut actions = Vec::new();
    for clip_id in candidates {
        let path = stream_dir.join(format!("{clip_id}.m2ts"));
        match read_prefix(&path, MAX_SCAN_BYTES).await {
            Ok(data) => {
                if let Some(ics) = scan_ig_stream(&data, &format!("{clip_id}.m2ts"), warnings) {
                    actions.extend(extract_button_actions(&ics));
                }
            }
            Err(e) => debug!("cannot read menu stream {}: {e}", path.display()),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    ig_chapter_marks(&actions)
}

async fn read_prefix(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = fs::File::open(path).await?;
    let mut data = Vec::new();
    file.take(limit as u64).read_to_end(&mut data).await?;
    Ok(data)
}
