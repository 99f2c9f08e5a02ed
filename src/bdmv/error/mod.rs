use thiserror::Error;

#[derive(Debug, Error)]
pub enum BdmvError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("need {want} byte(s) at offset {offset}, but only {remaining} remain")]
    BoundsError {
        offset: usize,
        want: usize,
        remaining: usize,
    },

    #[error("bad magic: expected {expected:?}, got {got:?}")]
    MagicMismatch { expected: &'static str, got: String },

    #[error("{section} declares {declared} byte(s) but only {remaining} remain")]
    LengthOverflow {
        section: &'static str,
        declared: usize,
        remaining: usize,
    },

    #[error("unsupported version {got:?}")]
    UnsupportedVersion { got: String },

    #[error("unknown value {raw:#04x} for {field}")]
    UnknownEnum { field: &'static str, raw: u32 },
}

pub type BdmvResult<T> = Result<T, BdmvError>;
