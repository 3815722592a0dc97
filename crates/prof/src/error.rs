//! Error types for report output.

use thiserror::Error;

/// Errors that can occur while emitting profiling reports.
///
/// Recording itself never fails; only writing to a sink or serializing a
/// snapshot can.
#[derive(Debug, Error)]
pub enum ProfError {
    /// Failed to write to the output sink
    #[error("Report write error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a profile export
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for report operations.
pub type ProfResult<T> = Result<T, ProfError>;
