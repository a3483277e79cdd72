//! Session store error types.

use thiserror::Error;

/// Errors that can occur when reading or writing session state.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Failed to open the backing store.
    #[error("Failed to open store: {0}")]
    OpenError(String),

    /// Failed to (de)serialize a session value.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// The backing store rejected an operation.
    #[error("Store operation failed: {0}")]
    StoreError(String),
}
