//! In-memory key-value store.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, instrument};

use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::KeyValueStore;
use pagecache_core::types::parse_counter;

/// Stored value with optional expiry.
#[derive(Clone, Debug)]
struct StoreEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn persistent(value: Vec<u8>) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn expiring(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// A live entry exported for persistence: key, value, remaining TTL.
pub(crate) type ExportedEntry = (String, Vec<u8>, Option<Duration>);

/// The value and remaining TTL held under a single key.
pub(crate) type SavedValue = (Vec<u8>, Option<Duration>);

/// In-memory key-value store.
///
/// Uses a sharded concurrent map, so reads and writes on different keys
/// never contend, and increments on the same key are serialized by the
/// shard lock.
///
/// # Expiry
///
/// Entries written with a TTL read as absent from the instant they expire.
/// Expired entries are dropped lazily on access, or in bulk by
/// [`cleanup_expired`](Self::cleanup_expired).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoreEntry>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the remaining lifetime of a key.
    ///
    /// `None` when the key is absent, expired, or has no expiry.
    pub fn time_to_live(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.remaining())
    }

    /// Returns true if a live entry exists for the key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| !e.is_expired())
    }

    /// Removes all expired entries.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired entries");
        }
        removed
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for entry in self.entries.iter() {
            stats.total_entries += 1;
            if entry.is_expired() {
                stats.expired_entries += 1;
            } else if entry.expires_at.is_some() {
                stats.expiring_entries += 1;
            } else {
                stats.persistent_entries += 1;
            }
        }
        stats
    }

    /// Exports all live entries with their remaining TTL.
    pub(crate) fn export(&self) -> Vec<ExportedEntry> {
        self.entries
            .iter()
            .filter(|e| !e.is_expired())
            .map(|e| (e.key().clone(), e.value.clone(), e.remaining()))
            .collect()
    }

    /// Imports a single entry, replacing any existing value.
    pub(crate) fn import(&self, key: String, value: Vec<u8>, ttl: Option<Duration>) {
        let entry = match ttl {
            Some(ttl) => StoreEntry::expiring(value, ttl),
            None => StoreEntry::persistent(value),
        };
        self.entries.insert(key, entry);
    }

    /// Returns the live value under `key`, for a later [`restore`](Self::restore).
    pub(crate) fn save_value(&self, key: &str) -> Option<SavedValue> {
        self.entries
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| (e.value.clone(), e.remaining()))
    }

    /// Puts back a value taken with [`save_value`](Self::save_value).
    ///
    /// `None` removes the key.
    pub(crate) fn restore(&self, key: &str, saved: Option<SavedValue>) {
        match saved {
            Some((value, ttl)) => self.import(key.to_string(), value, ttl),
            None => {
                self.entries.remove(key);
            }
        }
    }

    pub(crate) fn insert_expiring(&self, key: &str, value: &[u8], ttl: Duration) {
        self.entries
            .insert(key.to_string(), StoreEntry::expiring(value.to_vec(), ttl));
        debug!(key, ttl_ms = ttl.as_millis() as u64, "Stored entry");
    }

    /// Adds one to the decimal counter under `key`, starting from 0.
    pub(crate) fn increment_counter(&self, key: &str) -> Result<i64> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoreEntry::persistent(b"0".to_vec()));

        if entry.is_expired() {
            *entry = StoreEntry::persistent(b"0".to_vec());
        }

        let next = parse_counter(key, &entry.value)?
            .checked_add(1)
            .ok_or_else(|| PageCacheError::corrupt_entry(key, "increment would overflow"))?;
        entry.value = next.to_string().into_bytes();

        debug!(key, value = next, "Incremented counter");
        Ok(next)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, e| e.is_expired());
            debug!(key, "Entry expired");
        }
        Ok(None)
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.insert_expiring(key, value, ttl);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn increment(&self, key: &str) -> Result<i64> {
        self.increment_counter(key)
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries held, including expired ones not yet purged
    pub total_entries: usize,
    /// Entries past their expiry
    pub expired_entries: usize,
    /// Live entries with a TTL
    pub expiring_entries: usize,
    /// Entries without expiry (counters)
    pub persistent_entries: usize,
}
