//! Service configuration: cache policy, store backend, fetcher settings.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use pagecache_core::constants::RESULT_TTL_SECONDS;
use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::KeyValueStore;
use pagecache_http::{HttpFetcher, HttpFetcherConfig};
use pagecache_store::{FileStore, MemoryStore};

use crate::service::PageService;

/// Cache policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a cached page in seconds
    pub result_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            result_ttl_seconds: RESULT_TTL_SECONDS,
        }
    }
}

impl CacheConfig {
    /// Sets the cached page lifetime.
    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.result_ttl_seconds = seconds;
        self
    }

    /// Lifetime of a cached page.
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_seconds)
    }
}

/// Which key-value store backs the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local, lost on exit
    #[default]
    Memory,
    /// Snapshot file on local disk
    File,
    /// Shared Redis server
    Redis,
}

impl FromStr for StoreBackend {
    type Err = PageCacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            other => Err(PageCacheError::ConfigError(format!(
                "unknown store backend '{}' (expected memory, file, or redis)",
                other
            ))),
        }
    }
}

/// Full service configuration.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Store backend
    pub store: StoreBackend,
    /// Snapshot path for the file backend
    pub store_path: PathBuf,
    /// Server URL for the Redis backend
    pub redis_url: String,
    /// HTTP fetcher settings
    pub http: HttpFetcherConfig,
    /// Cache policy
    pub cache: CacheConfig,
}

const DEFAULT_STORE_PATH: &str = "pagecache.store";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::default(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            redis_url: DEFAULT_REDIS_URL.into(),
            http: HttpFetcherConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads configuration from the environment, loading `.env` first if present.
    ///
    /// | Variable                  | Field                     |
    /// |---------------------------|---------------------------|
    /// | `PAGECACHE_STORE`         | `store`                   |
    /// | `PAGECACHE_STORE_PATH`    | `store_path`              |
    /// | `REDIS_URL`               | `redis_url`               |
    /// | `PAGECACHE_FETCH_TIMEOUT` | `http.timeout_seconds`    |
    /// | `PAGECACHE_RESULT_TTL`    | `cache.result_ttl_seconds`|
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(store) = lookup("PAGECACHE_STORE") {
            config.store = store.parse()?;
        }
        if let Some(path) = lookup("PAGECACHE_STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("REDIS_URL") {
            config.redis_url = url;
        }
        if let Some(timeout) = lookup("PAGECACHE_FETCH_TIMEOUT") {
            config.http.timeout_seconds = parse_seconds("PAGECACHE_FETCH_TIMEOUT", &timeout)?;
        }
        if let Some(ttl) = lookup("PAGECACHE_RESULT_TTL") {
            config.cache.result_ttl_seconds = parse_seconds("PAGECACHE_RESULT_TTL", &ttl)?;
        }

        Ok(config)
    }

    /// Opens the configured store and fetcher and wires them into a service.
    pub async fn build(&self) -> Result<PageService> {
        if self.cache.result_ttl_seconds == 0 {
            return Err(PageCacheError::ConfigError(
                "result TTL must be at least one second".into(),
            ));
        }

        let store = self.open_store().await?;
        let fetcher = Arc::new(HttpFetcher::with_config(self.http.clone())?);

        info!(
            store = ?self.store,
            ttl_s = self.cache.result_ttl_seconds,
            timeout_s = self.http.timeout_seconds,
            "PageService ready"
        );
        Ok(PageService::new(store, fetcher, self.cache.clone()))
    }

    async fn open_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        match self.store {
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreBackend::File => Ok(Arc::new(FileStore::new(&self.store_path).await?)),
            #[cfg(feature = "redis")]
            StoreBackend::Redis => Ok(Arc::new(
                pagecache_store::RedisStore::connect(&self.redis_url).await?,
            )),
            #[cfg(not(feature = "redis"))]
            StoreBackend::Redis => Err(PageCacheError::ConfigError(
                "Redis store requires the `redis` feature".into(),
            )),
        }
    }
}

fn parse_seconds(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| PageCacheError::ConfigError(format!("{} must be whole seconds, got '{}'", name, raw)))
}
