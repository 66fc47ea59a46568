//! The single entry point: track, then serve through the cache.

use std::sync::Arc;

use tracing::{debug, instrument};

use pagecache_core::error::Result;
use pagecache_core::traits::{KeyValueStore, PageFetcher};
use pagecache_core::types::ResourceId;

use crate::config::CacheConfig;
use crate::fetcher::CacheFetcher;
use crate::tracker::Tracker;

/// Tracked, cached page fetching.
///
/// Resolves a page in four steps:
/// 1. Blank identifiers return `""` without touching the store
/// 2. The access is counted, whatever happens next
/// 3. A cached copy younger than the TTL is returned as is
/// 4. Otherwise the page is fetched, cached, and returned
///
/// The count is not rolled back when the fetch fails: it records attempts.
#[derive(Clone)]
pub struct PageService {
    tracker: Tracker,
    cache: CacheFetcher,
}

impl PageService {
    /// Wires a service over a shared store and a page fetcher.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn PageFetcher>,
        config: CacheConfig,
    ) -> Self {
        Self {
            tracker: Tracker::new(store.clone()),
            cache: CacheFetcher::new(store, fetcher, config),
        }
    }

    /// Fetches a page, counting the access and caching the result.
    #[instrument(skip(self))]
    pub async fn fetch(&self, resource_id: &str) -> Result<String> {
        let Some(id) = ResourceId::parse(resource_id) else {
            debug!("Blank resource identifier, nothing to fetch");
            return Ok(String::new());
        };

        self.fetch_resource(&id).await
    }

    /// Like [`fetch`](Self::fetch), treating an absent identifier as blank.
    pub async fn fetch_optional(&self, resource_id: Option<&str>) -> Result<String> {
        match resource_id {
            Some(raw) => self.fetch(raw).await,
            None => Ok(String::new()),
        }
    }

    /// Fetches a page for an already validated identifier.
    pub async fn fetch_resource(&self, id: &ResourceId) -> Result<String> {
        self.tracker.increment(id).await?;
        self.cache.get_or_fetch(id).await
    }

    /// Returns how many times `resource_id` has been requested.
    ///
    /// Blank identifiers are never tracked and always report 0.
    pub async fn request_count(&self, resource_id: &str) -> Result<u64> {
        match ResourceId::parse(resource_id) {
            Some(id) => self.tracker.count(&id).await,
            None => Ok(0),
        }
    }

    /// Returns the tracker.
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Returns the cache.
    pub fn cache(&self) -> &CacheFetcher {
        &self.cache
    }
}
