//! Error primitives for persisted state.

use thiserror::Error;

/// Errors surfaced by storage tiers and the config store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A value was too large for the small tier's per-entry ceiling.
    #[error("value for {key} exceeds the small-tier ceiling ({size} > {limit} bytes)")]
    QuotaExceeded {
        /// Storage key the write was addressed to.
        key: String,
        /// Size of the rejected value in bytes.
        size: usize,
        /// Per-entry ceiling in bytes.
        limit: usize,
    },
    /// The storage backend failed to service a request.
    #[error("storage backend failure for {key}: {detail}")]
    Backend {
        /// Storage key the request was addressed to.
        key: String,
        /// Underlying failure description.
        detail: String,
    },
    /// A payload could not be encoded or decoded as JSON.
    #[error("failed to encode persisted payload")]
    Encode(#[from] serde_json::Error),
}

/// Result wrapper for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
