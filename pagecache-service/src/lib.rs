//! # PAGECACHE Service
//!
//! Tracked, short-lived caching of remote page fetches.
//!
//! Every call to [`PageService::fetch`] counts one access for the resource,
//! then serves the page from the shared store if a copy younger than the
//! result TTL exists, or fetches, stores, and returns it otherwise.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pagecache_service::{CacheConfig, PageService};
//! use pagecache_store::MemoryStore;
//! use pagecache_http::HttpFetcher;
//!
//! let service = PageService::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(HttpFetcher::new()?),
//!     CacheConfig::default(),
//! );
//!
//! let page = service.fetch("http://example.com").await?;
//! assert_eq!(service.request_count("http://example.com").await?, 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod fetcher;
mod service;
mod tracker;

#[cfg(test)]
mod testing;

pub use config::{CacheConfig, ServiceConfig, StoreBackend};
pub use fetcher::CacheFetcher;
pub use service::PageService;
pub use tracker::Tracker;

pub use pagecache_core::{PageCacheError, ResourceId, Result};
