use std::path::PathBuf;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BdscanError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("cannot find a BDMV structure at {0} (expected PLAYLIST/ or BDMV/PLAYLIST/)")]
    BdmvRootNotFound(PathBuf),

    #[error("playlist not found: {0}")]
    PlaylistNotFound(String),
}

pub type BdscanResult<T> = result::Result<T, BdscanError>;
