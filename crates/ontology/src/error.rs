use thiserror::Error;

/// Errors from the persistent store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store used before a backend was attached.
    #[error("ontology store not initialized")]
    NotInitialized,
    /// Transport or status failure against the backing table.
    #[error("store transport failure: {0}")]
    Transport(String),
    /// A row that violates the table invariants (empty id, empty path).
    #[error("invalid concept row: {0}")]
    InvalidRow(String),
}
