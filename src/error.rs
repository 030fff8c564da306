use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for logsieve operations.
pub type SieveResult<T> = Result<T, SieveError>;

/// Error type shared across ingestion, filtering, storage and session management.
///
/// Missing input files are deliberately *not* represented here: the pipeline treats a
/// non-existent path as "zero lines produced" so one stale filename cannot abort a batch.
#[derive(Debug, Error)]
pub enum SieveError {
    /// I/O failure tied to a specific input file (unreadable file, broken gzip stream, ...).
    #[error("io error on '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying I/O error with no single input file attached (registry, stdout, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A filter constructor or stats query was given an invalid regular expression.
    ///
    /// Raised at construction time, before any line is processed.
    #[error("invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Storage/query error from the analytical engine.
    #[error("store error: {0}")]
    Store(#[from] polars::error::PolarsError),

    /// Session registry (de)serialization error.
    #[error("session registry error: {0}")]
    Registry(#[from] serde_json::Error),

    /// Session-level usage error (unknown name, no active session, invalid name).
    #[error("session error: {message}")]
    Session { message: String },
}
