use std::io;
use thiserror::Error;

/// Errors surfaced while loading the WNdb files.
#[derive(Debug, Error)]
pub enum WordNetError {
    /// Filesystem failure while reading a dictionary file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The directory did not contain a usable dictionary.
    #[error("wordnet parse error: {0}")]
    Parse(String),
}
