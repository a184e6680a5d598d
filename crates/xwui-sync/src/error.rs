//! Error primitives for style synchronization.

use thiserror::Error;
use xwui_store::StoreError;

/// Errors surfaced while driving resolution and apply cycles.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Persisted state could not be read or written.
    #[error("persisted state failure")]
    Store(#[from] StoreError),
    /// The apply target rejected a resolved configuration.
    #[error("apply target failure: {detail}")]
    Apply {
        /// Underlying failure description.
        detail: String,
    },
}

/// Result wrapper for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
