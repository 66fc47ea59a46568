//! Error types for PAGECACHE.
//!
//! This module provides the error hierarchy using `thiserror`.
//! Blank resource identifiers are not an error: they short-circuit to an
//! empty page and never reach this type.

use thiserror::Error;

/// Result type alias using `PageCacheError`.
pub type Result<T> = std::result::Result<T, PageCacheError>;

/// Main error type for all PAGECACHE operations.
#[derive(Debug, Error)]
pub enum PageCacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The shared key-value store could not be reached or rejected a command.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored value does not have the shape its key implies.
    #[error("Corrupt entry '{key}': {reason}")]
    CorruptEntry { key: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // FETCH ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The external page fetch failed (network, status, timeout, or body).
    #[error("Fetch failed for '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // PERSISTENCE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Store snapshot is malformed.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Snapshot format version mismatch.
    #[error("Snapshot version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PageCacheError {
    /// Builds a `FetchFailed` for the given URL.
    pub fn fetch_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        PageCacheError::FetchFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Builds a `CorruptEntry` for the given key.
    pub fn corrupt_entry(key: impl Into<String>, reason: impl Into<String>) -> Self {
        PageCacheError::CorruptEntry {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error came from the shared store.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            PageCacheError::StoreUnavailable(_) | PageCacheError::CorruptEntry { .. }
        )
    }

    /// Returns true if this error came from the external page fetch.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, PageCacheError::FetchFailed { .. })
    }

    /// Returns true if a later attempt might succeed.
    ///
    /// Informational only: nothing in PAGECACHE retries on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PageCacheError::StoreUnavailable(_)
                | PageCacheError::FetchFailed { .. }
                | PageCacheError::IoError(_)
        )
    }
}
