//! # PAGECACHE Store
//!
//! Key-value store backends for request counters and cached pages.
//!
//! This crate provides multiple storage backends:
//!
//! - **Memory**: Fast in-memory storage for development and testing
//! - **File**: Persistent file-based storage for single-node deployments
//! - **Redis**: Shared storage for multi-process deployments (`redis` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use pagecache_store::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set_with_ttl("result:http://example.com", b"<html/>", Duration::from_secs(10)).await?;
//! assert_eq!(store.increment("count:http://example.com").await?, 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use file::FileStore;
pub use memory::{MemoryStore, StoreStats};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

// Re-export the trait from core
pub use pagecache_core::traits::KeyValueStore;
