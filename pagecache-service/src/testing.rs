//! Test doubles for the store and fetcher collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::{KeyValueStore, PageFetcher};

/// Fetcher returning a fixed body (or failing) and counting calls.
pub(crate) struct MockFetcher {
    body: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub(crate) fn serving(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Some(body.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            body: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave
        tokio::task::yield_now().await;
        self.body
            .clone()
            .ok_or_else(|| PageCacheError::fetch_failed(url, "connection refused"))
    }
}

/// Store whose every operation fails as unreachable.
pub(crate) struct DownStore;

#[async_trait]
impl KeyValueStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(PageCacheError::StoreUnavailable("connection refused".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<()> {
        Err(PageCacheError::StoreUnavailable("connection refused".into()))
    }

    async fn increment(&self, _key: &str) -> Result<i64> {
        Err(PageCacheError::StoreUnavailable("connection refused".into()))
    }
}
