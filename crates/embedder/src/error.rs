use thiserror::Error;

/// Errors surfaced by the embedding provider.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The remote endpoint could not be reached or returned a transport error.
    #[error("embedding request failed: {0}")]
    Request(String),
    /// The endpoint responded with a shape we could not interpret.
    #[error("embedding response malformed: {0}")]
    Malformed(String),
}
