//! Error types for fleet-store.

use thiserror::Error;

/// Errors a [`KvBackend`](crate::KvBackend) or record decoding can raise.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend is temporarily unreachable.  Safe accessors turn this into
    /// the caller's default (reads) or a logged no-op (writes).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("key {key} holds a {actual}, not a {expected}")]
    WrongType {
        key:      String,
        expected: &'static str,
        actual:   &'static str,
    },

    #[error("cannot decode {key}.{field}: {reason}")]
    Decode {
        key:    String,
        field:  String,
        reason: String,
    },
}

impl StoreError {
    /// `true` for failures that may clear up on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;
