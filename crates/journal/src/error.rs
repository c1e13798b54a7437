use thiserror::Error;

use crate::{OrderId, Version};

/// Errors that can occur when interacting with the checkpoint log.
#[derive(Debug, Error)]
pub enum JournalError {
    /// A concurrency conflict occurred when appending records.
    /// The expected version did not match the actual version.
    #[error(
        "Concurrency conflict for saga {saga_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        saga_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// A batch of records failed validation before appending.
    #[error("Invalid record batch: {0}")]
    InvalidBatch(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for checkpoint log operations.
pub type Result<T> = std::result::Result<T, JournalError>;
