//! Redis-backed key-value store.
//!
//! Maps the store operations onto `GET`, `PSETEX`, and `INCR`, so expiry and
//! counter atomicity are enforced by the Redis server itself.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info, instrument};

use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::KeyValueStore;

/// Redis key-value store.
///
/// Holds a single multiplexed connection that is cloned per command; clones
/// share the underlying socket.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    url: String,
}

impl RedisStore {
    /// Connects to the Redis server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    #[instrument]
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| PageCacheError::ConfigError(format!("invalid Redis URL: {}", e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;

        info!(url, "Connected to Redis");
        Ok(Self {
            conn,
            url: url.to_string(),
        })
    }

    /// Returns the URL this store connected to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn unavailable(err: redis::RedisError) -> PageCacheError {
    PageCacheError::StoreUnavailable(err.to_string())
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(unavailable)?;
        debug!(key, hit = value.is_some(), "GET");
        Ok(value)
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        // PSETEX rejects a zero expiry
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();
        let _: () = conn.pset_ex(key, value, millis).await.map_err(unavailable)?;
        debug!(key, ttl_ms = millis, "PSETEX");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn increment(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1i64).await.map_err(|e| {
            if e.kind() == redis::ErrorKind::ResponseError {
                PageCacheError::corrupt_entry(key, e.to_string())
            } else {
                unavailable(e)
            }
        })?;
        debug!(key, value, "INCR");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let result = RedisStore::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(PageCacheError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_store_unavailable() {
        // Port 1 is reserved and never serves Redis.
        let result = RedisStore::connect("redis://127.0.0.1:1/").await;
        assert!(matches!(result, Err(PageCacheError::StoreUnavailable(_))));
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at REDIS_URL"]
    async fn test_round_trip_against_server() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());
        let store = RedisStore::connect(&url).await.unwrap();

        let key = format!("count:pagecache-test-{}", std::process::id());
        let first = store.increment(&key).await.unwrap();
        assert_eq!(store.increment(&key).await.unwrap(), first + 1);

        let result_key = format!("result:pagecache-test-{}", std::process::id());
        store
            .set_with_ttl(&result_key, b"<html>hello</html>", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(
            store.get(&result_key).await.unwrap().unwrap(),
            b"<html>hello</html>"
        );
    }
}
