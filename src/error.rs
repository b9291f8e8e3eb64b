//! Error types for the sniplets core.
//!
//! Only genuinely fatal conditions are errors: a corrupt packed payload or a
//! storage-boundary failure. Path-resolution misses return `None` and invalid
//! edit values are cleared locally; neither has an error variant.

use thiserror::Error;

/// Packed payload is corrupt or not valid compressed/encoded data.
///
/// Fatal for that load; carries the offending payload for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("failed to parse packed document: {reason}")]
pub struct ParseError {
    pub reason: String,
    /// The payload that failed to decode, when available.
    pub payload: Option<String>,
}

impl ParseError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            payload: None,
        }
    }

    pub fn with_payload(reason: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            payload: Some(payload.into()),
        }
    }
}

/// Failures at the external storage boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Serialized document is too large for the target partition. Nothing
    /// was written.
    #[error("document of {size} bytes exceeds storage limit of {limit} bytes")]
    SizeLimitExceeded { size: usize, limit: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Top-level error surfaced to library consumers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    ConfigError(String),
}
