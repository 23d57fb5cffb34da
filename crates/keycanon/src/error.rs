use std::io;
use thiserror::Error;

/// Errors from the key-canonicalizer sidecar files.
///
/// Persistence failures never surface to callers — canonicalization keeps
/// going in memory and the failure is logged — but the type keeps the I/O
/// and serialization causes distinguishable in those logs.
#[derive(Debug, Error)]
pub enum KeyCanonError {
    /// Filesystem failure while reading or writing a sidecar.
    #[error("sidecar io error: {0}")]
    Io(#[from] io::Error),
    /// A sidecar held JSON we could not produce or interpret.
    #[error("sidecar serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
