use thiserror::Error;

/// Adapter-internal error. Deliberately never crosses the adapter boundary:
/// every public operation logs and returns an empty result instead, so one
/// source's outage cannot block the others.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Timeout, non-2xx status, or a body that failed to decode.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The daily free-tier budget for this source is spent.
    #[error("daily quota exhausted")]
    QuotaExhausted,
    /// Required API key is not configured.
    #[error("api key not configured")]
    NotConfigured,
}
