//! File-based key-value store with persistence.
//!
//! Stores entries in a snapshot file with automatic saves.
//! Suitable for single-node deployments and CLI use, where counters must
//! survive between process runs. Several handles, in one process or many,
//! may share a file opened with [`FileStore::new`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::KeyValueStore;

use crate::MemoryStore;

/// File-based key-value store.
///
/// Uses a memory store internally with persistence to disk after every
/// `auto_save_threshold` writes.
///
/// # Sharing a file
///
/// With a threshold of 1 (the default) the store is write-through: every
/// write takes an exclusive advisory lock on a `.lock` file next to the
/// snapshot, reloads the snapshot, applies the change and saves before
/// releasing the lock, and every read reloads first. Increments from
/// different handles on the same path are therefore never lost.
///
/// A threshold above 1 buffers writes in memory between saves. Such a
/// handle must be the only writer of its file: a save replaces the whole
/// snapshot with this handle's view.
///
/// A write whose save fails is rolled back in memory and returns
/// `StoreUnavailable`.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "PGCS"
/// version (1 byte): 1
/// count (8 bytes): number of entries, little-endian
/// entries (variable): JSON array of entries
/// ```
///
/// Expiry is stored as an absolute Unix timestamp in milliseconds, so a
/// cached page written by one process expires on schedule for the next.
pub struct FileStore {
    /// Path to the snapshot file
    path: PathBuf,
    /// In-memory storage
    memory: MemoryStore,
    /// Whether there are unsaved changes
    dirty: AtomicBool,
    /// Auto-save threshold (save once this many writes are pending)
    auto_save_threshold: u64,
    /// Writes since last save
    writes_since_save: AtomicU64,
    /// Serializes writes and saves within this handle
    write_lock: Mutex<()>,
}

/// File format magic bytes
const MAGIC: &[u8; 4] = b"PGCS";
/// Current file format version
const VERSION: u8 = 1;
/// Magic + version + count
const HEADER_LEN: usize = 13;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    value: Vec<u8>,
    expires_at_ms: Option<i64>,
}

/// Exclusive advisory lock on the store's lock file, released on drop.
struct FileLock(std::fs::File);

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileStore {
    /// Opens a write-through file store at the given path.
    ///
    /// If the file exists, it will be loaded. Otherwise, an empty store
    /// is created and the file will be created on first save.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_auto_save(path, 1).await
    }

    /// Opens a file store that saves once `threshold` writes are pending.
    ///
    /// A threshold of 0 is treated as 1.
    pub async fn with_auto_save(path: impl AsRef<Path>, threshold: u64) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryStore::new(),
            dirty: AtomicBool::new(false),
            auto_save_threshold: threshold.max(1),
            writes_since_save: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        };

        if let Some((count, skipped)) = store.reload().await? {
            info!(count, skipped, path = ?store.path, "Loaded store from file");
        }

        Ok(store)
    }

    fn write_through(&self) -> bool {
        self.auto_save_threshold == 1
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Replaces the memory contents with the snapshot on disk.
    ///
    /// Entries already expired are skipped. Returns `None` when there is no
    /// file yet, leaving the memory empty.
    async fn reload(&self) -> Result<Option<(u64, usize)>> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.memory.clear();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let entries = decode(&contents)?;
        let count = entries.len() as u64;

        self.memory.clear();
        let now_ms = Utc::now().timestamp_millis();
        let mut skipped = 0usize;
        for entry in entries {
            let ttl = match entry.expires_at_ms {
                Some(at) if at <= now_ms => {
                    skipped += 1;
                    continue;
                }
                Some(at) => Some(Duration::from_millis((at - now_ms) as u64)),
                None => None,
            };
            self.memory.import(entry.key, entry.value, ttl);
        }

        self.dirty.store(false, Ordering::SeqCst);
        self.writes_since_save.store(0, Ordering::SeqCst);
        debug!(count, skipped, path = ?self.path, "Reloaded store");
        Ok(Some((count, skipped)))
    }

    /// Takes the exclusive lock shared by every handle on this path.
    async fn lock_file(&self) -> Result<FileLock> {
        let lock_path = self.lock_path();
        let locked = tokio::task::spawn_blocking(move || -> std::io::Result<FileLock> {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(FileLock(file))
        })
        .await;

        match locked {
            Ok(Ok(lock)) => Ok(lock),
            Ok(Err(e)) => Err(self.unavailable("lock", e)),
            Err(e) => Err(self.unavailable("lock", e)),
        }
    }

    fn unavailable(&self, action: &str, e: impl std::fmt::Display) -> PageCacheError {
        warn!(error = %e, path = ?self.path, action, "File store unavailable");
        PageCacheError::StoreUnavailable(format!(
            "failed to {} {}: {}",
            action,
            self.path.display(),
            e
        ))
    }

    /// Saves live entries to the file.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let _file_lock = self.lock_file().await?;
        if self.write_through() {
            self.reload().await?;
        }
        self.write_snapshot().await
    }

    /// Writes the snapshot, keeping the pending state if the write fails.
    ///
    /// The dirty flag and pending count are taken before the export, so a
    /// write landing during the save stays pending.
    async fn write_snapshot(&self) -> Result<()> {
        let was_dirty = self.dirty.swap(false, Ordering::SeqCst);
        let pending = self.writes_since_save.swap(0, Ordering::SeqCst);

        if let Err(e) = self.write_file().await {
            if was_dirty {
                self.dirty.store(true, Ordering::SeqCst);
            }
            self.writes_since_save.fetch_add(pending, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    async fn write_file(&self) -> Result<()> {
        let now_ms = Utc::now().timestamp_millis();
        let entries: Vec<PersistedEntry> = self
            .memory
            .export()
            .into_iter()
            .map(|(key, value, ttl)| PersistedEntry {
                key,
                value,
                expires_at_ms: ttl.map(|ttl| now_ms + ttl.as_millis() as i64),
            })
            .collect();
        let count = entries.len() as u64;

        let serialized = serde_json::to_vec(&entries)?;

        let mut contents = Vec::with_capacity(HEADER_LEN + serialized.len());
        contents.extend_from_slice(MAGIC);
        contents.push(VERSION);
        contents.extend_from_slice(&count.to_le_bytes());
        contents.extend_from_slice(&serialized);

        // Write atomically (write to temp, then rename)
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(count, path = ?self.path, "Store saved");
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Forces a save if dirty.
    pub async fn flush(&self) -> Result<()> {
        if self.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory store for direct access.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Applies one write to `key` and saves if the auto-save threshold is reached.
    ///
    /// When the save fails the write is undone and `StoreUnavailable` is
    /// returned; earlier buffered writes stay pending.
    async fn write<T>(
        &self,
        key: &str,
        apply: impl FnOnce(&MemoryStore) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.write_lock.lock().await;

        let file_lock = if self.write_through() {
            let lock = self.lock_file().await?;
            self.reload().await.map_err(|e| self.unavailable("reload", e))?;
            Some(lock)
        } else {
            None
        };

        let saved = self.memory.save_value(key);
        let value = apply(&self.memory)?;

        self.dirty.store(true, Ordering::SeqCst);
        let pending = self.writes_since_save.fetch_add(1, Ordering::SeqCst) + 1;
        if pending < self.auto_save_threshold {
            return Ok(value);
        }

        let persisted = match file_lock {
            Some(_) => self.write_snapshot().await,
            None => match self.lock_file().await {
                Ok(_lock) => self.write_snapshot().await,
                Err(e) => Err(e),
            },
        };

        if let Err(e) = persisted {
            self.memory.restore(key, saved);
            if self.writes_since_save.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.dirty.store(false, Ordering::SeqCst);
            }
            return Err(match e {
                PageCacheError::StoreUnavailable(_) => e,
                e => self.unavailable("persist", e),
            });
        }

        Ok(value)
    }
}

/// Parses a snapshot file.
fn decode(contents: &[u8]) -> Result<Vec<PersistedEntry>> {
    if contents.len() < HEADER_LEN {
        return Err(PageCacheError::PersistenceError("File too short".into()));
    }

    if &contents[0..4] != MAGIC {
        return Err(PageCacheError::PersistenceError("Invalid magic bytes".into()));
    }

    let version = contents[4];
    if version != VERSION {
        return Err(PageCacheError::VersionMismatch {
            expected: VERSION,
            actual: version,
        });
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&contents[5..HEADER_LEN]);
    let count = u64::from_le_bytes(count_bytes);

    let entries: Vec<PersistedEntry> = if contents.len() > HEADER_LEN {
        serde_json::from_slice(&contents[HEADER_LEN..])?
    } else {
        Vec::new()
    };

    if entries.len() as u64 != count {
        return Err(PageCacheError::PersistenceError(format!(
            "Header declares {} entries, found {}",
            count,
            entries.len()
        )));
    }

    Ok(entries)
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.is_dirty() {
            warn!(path = ?self.path, "FileStore dropped with unsaved changes");
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.write_through() {
            let _guard = self.write_lock.lock().await;
            self.reload().await.map_err(|e| self.unavailable("reload", e))?;
            return self.memory.get(key).await;
        }
        self.memory.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.write(key, |memory| {
            memory.insert_expiring(key, value, ttl);
            Ok(())
        })
        .await
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        self.write(key, |memory| memory.increment_counter(key)).await
    }
}
