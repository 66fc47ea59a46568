//! Read-through page cache.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::{KeyValueStore, PageFetcher};
use pagecache_core::types::ResourceId;

use crate::config::CacheConfig;

/// Serves pages from `result:<id>` while fresh, otherwise fetches and stores them.
///
/// Concurrent misses for the same resource may each fetch and each write;
/// the last write wins and its TTL applies. Nothing is written when the
/// fetch fails.
#[derive(Clone)]
pub struct CacheFetcher {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn PageFetcher>,
    config: CacheConfig,
}

impl CacheFetcher {
    /// Creates a cache over `store` that falls back to `fetcher` on a miss.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn PageFetcher>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Reads the cached page, if present and unexpired.
    pub async fn lookup(&self, id: &ResourceId) -> Result<Option<String>> {
        let key = id.result_key();
        match self.store.get(&key).await? {
            None => Ok(None),
            Some(raw) => String::from_utf8(raw)
                .map(Some)
                .map_err(|_| PageCacheError::corrupt_entry(key, "cached page is not valid UTF-8")),
        }
    }

    /// Caches a page for the configured TTL.
    pub async fn store(&self, id: &ResourceId, page: &str) -> Result<()> {
        self.store
            .set_with_ttl(&id.result_key(), page.as_bytes(), self.config.result_ttl())
            .await
    }

    /// Returns the cached page, fetching and caching it on a miss.
    #[instrument(skip(self), fields(resource = %id))]
    pub async fn get_or_fetch(&self, id: &ResourceId) -> Result<String> {
        if let Some(page) = self.lookup(id).await? {
            debug!(len = page.len(), "Cache hit");
            return Ok(page);
        }

        debug!("Cache miss, fetching");

        let body = self
            .fetcher
            .fetch_page(id.as_str())
            .await
            .inspect_err(|e| warn!(error = %e, "Fetch failed, nothing cached"))?;

        let page = String::from_utf8(body).map_err(|e| {
            warn!("Fetched body is not valid UTF-8, nothing cached");
            PageCacheError::fetch_failed(id.as_str(), format!("response body is not valid UTF-8: {}", e))
        })?;

        self.store(id, &page).await?;
        info!(len = page.len(), ttl_s = self.config.result_ttl_seconds, "Cached page");

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{DownStore, MockFetcher};
    use pagecache_store::MemoryStore;

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    fn cache(store: Arc<MemoryStore>, fetcher: Arc<MockFetcher>) -> CacheFetcher {
        CacheFetcher::new(store, fetcher, CacheConfig::default())
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(MockFetcher::serving("<html>hello</html>"));
        let cache = cache(store.clone(), fetcher.clone());
        let url = id("http://example.com");

        assert_eq!(cache.get_or_fetch(&url).await.unwrap(), "<html>hello</html>");
        assert_eq!(fetcher.calls(), 1);

        let ttl = store.time_to_live("result:http://example.com").unwrap();
        assert!(ttl <= Duration::from_secs(10));
        assert!(ttl > Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(MockFetcher::serving("<html>hello</html>"));
        let cache = cache(store, fetcher.clone());
        let url = id("http://example.com");

        let first = cache.get_or_fetch(&url).await.unwrap();
        let second = cache.get_or_fetch(&url).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_lookup_returns_stored_page() {
        let cache = cache(
            Arc::new(MemoryStore::new()),
            Arc::new(MockFetcher::failing()),
        );
        let url = id("http://example.com");

        assert!(cache.lookup(&url).await.unwrap().is_none());
        cache.store(&url, "seeded").await.unwrap();
        assert_eq!(cache.lookup(&url).await.unwrap().unwrap(), "seeded");
    }

    #[tokio::test]
    async fn test_fetch_failure_caches_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone(), Arc::new(MockFetcher::failing()));

        let err = cache.get_or_fetch(&id("http://down.example")).await.unwrap_err();
        assert!(matches!(err, PageCacheError::FetchFailed { .. }));
        assert!(!store.contains_key("result:http://down.example"));
    }

    #[tokio::test]
    async fn test_non_utf8_body_caches_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone(), Arc::new(MockFetcher::serving(vec![0xff, 0xfe, 0x00])));

        let err = cache.get_or_fetch(&id("http://binary.example")).await.unwrap_err();
        assert!(err.is_fetch_error());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cached_page() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_with_ttl("result:http://example.com", &[0xff, 0xfe], Duration::from_secs(10))
            .await
            .unwrap();
        let fetcher = Arc::new(MockFetcher::serving("fresh"));
        let cache = cache(store, fetcher.clone());

        let err = cache.get_or_fetch(&id("http://example.com")).await.unwrap_err();
        assert!(matches!(err, PageCacheError::CorruptEntry { .. }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetched() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(MockFetcher::serving("<html>hello</html>"));
        let cache = cache(store, fetcher.clone());
        let url = id("http://example.com");

        cache.get_or_fetch(&url).await.unwrap();
        tokio::time::advance(Duration::from_millis(10_100)).await;
        cache.get_or_fetch(&url).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(MockFetcher::serving("page"));
        let cache = CacheFetcher::new(store, fetcher.clone(), CacheConfig::default().with_ttl(60));
        let url = id("http://example.com");

        cache.get_or_fetch(&url).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.get_or_fetch(&url).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_down_propagates() {
        let fetcher = Arc::new(MockFetcher::serving("page"));
        let cache = CacheFetcher::new(Arc::new(DownStore), fetcher.clone(), CacheConfig::default());

        let err = cache.get_or_fetch(&id("http://example.com")).await.unwrap_err();
        assert!(matches!(err, PageCacheError::StoreUnavailable(_)));
        assert_eq!(fetcher.calls(), 0);
    }
}
