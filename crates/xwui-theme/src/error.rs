//! Error primitives for manifest and preset loading.

use thiserror::Error;

/// Errors surfaced while loading or parsing style documents.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// A document could not be fetched from the configured source.
    #[error("failed to fetch document at {path}: {detail}")]
    Fetch {
        /// Path of the document that failed to load.
        path: String,
        /// Underlying failure description.
        detail: String,
    },
    /// A document was fetched but did not parse as expected.
    #[error("failed to parse document at {path}: {detail}")]
    Parse {
        /// Path of the document that failed to parse.
        path: String,
        /// Underlying parse failure description.
        detail: String,
    },
}

/// Result wrapper for theme loading operations.
pub type ThemeResult<T> = Result<T, ThemeError>;
