//! Per-resource access counting.

use std::sync::Arc;

use tracing::{debug, instrument};

use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::KeyValueStore;
use pagecache_core::types::{parse_counter, ResourceId};

/// Records one access per request under `count:<id>`.
///
/// Atomicity comes from the store's increment; the tracker holds no state
/// of its own and never retries.
#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn KeyValueStore>,
}

impl Tracker {
    /// Creates a tracker over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Counts one access, returning the new total.
    #[instrument(skip(self), fields(resource = %id))]
    pub async fn increment(&self, id: &ResourceId) -> Result<i64> {
        let count = self.store.increment(&id.count_key()).await?;
        debug!(count, "Tracked access");
        Ok(count)
    }

    /// Returns the number of accesses recorded, 0 if none.
    #[instrument(skip(self), fields(resource = %id))]
    pub async fn count(&self, id: &ResourceId) -> Result<u64> {
        let key = id.count_key();
        match self.store.get(&key).await? {
            None => Ok(0),
            Some(raw) => {
                let value = parse_counter(&key, &raw)?;
                u64::try_from(value)
                    .map_err(|_| PageCacheError::corrupt_entry(key, "counter is negative"))
            }
        }
    }
}
