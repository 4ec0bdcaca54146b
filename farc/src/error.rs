use thiserror::Error;

use fcore::name::NameError;

#[derive(Error, Debug)]
pub enum ArcError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}: not found")]
    NotFound(String),
    // Failures on the member side of a copy, the archive itself is still fine
    #[error("reading {name}: {source}")]
    Read {
        name: String,
        source: std::io::Error,
    },
    #[error("writing {name}: {source}")]
    Write {
        name: String,
        source: std::io::Error,
    },
    #[error("{name}: expected {expected} bytes, copied {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },
    #[error("corrupt entry at byte {pos}: {reason}")]
    Corrupt { pos: u64, reason: &'static str },
    #[error(transparent)]
    Name(#[from] NameError),
    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

pub type Result<T> = std::result::Result<T, ArcError>;
