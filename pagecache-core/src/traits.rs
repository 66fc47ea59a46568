//! Collaborator traits for PAGECACHE.
//!
//! The caching and tracking layer only talks to the outside world through
//! these two interfaces, so stores and transports can be swapped (and mocked
//! in tests) without touching the core.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// KEY-VALUE STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the shared, durable key-value store.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A snapshot file (for single-node deployments)
/// - Redis (for shared deployments)
///
/// Every failure to reach the store surfaces as
/// [`PageCacheError::StoreUnavailable`](crate::PageCacheError::StoreUnavailable).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes a value that expires `ttl` after this call.
    ///
    /// Overwrites any existing value and resets its expiry.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Atomically increments an integer value, creating it at 1 if absent.
    ///
    /// Returns the value after the increment. Counters are stored as
    /// decimal ASCII so they can be read back through [`get`](Self::get).
    async fn increment(&self, key: &str) -> Result<i64>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAGE FETCHER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the external page fetch.
///
/// Network errors, non-success statuses, and timeouts all surface as
/// [`PageCacheError::FetchFailed`](crate::PageCacheError::FetchFailed).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the raw body at `url`.
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>>;
}
