//! # PAGECACHE Core
//!
//! Core types, errors, and traits for tracked, short-lived page caching.
//!
//! This crate provides the foundational building blocks used by all other PAGECACHE crates:
//!
//! - **Types**: Resource identifiers and the store keys derived from them
//! - **Errors**: A single error type covering store, fetch, and persistence failures
//! - **Constants**: Key prefixes and the result TTL
//! - **Traits**: The key-value store and page fetcher collaborators
//!
//! ## Example
//!
//! ```rust
//! use pagecache_core::ResourceId;
//!
//! let id = ResourceId::parse("http://example.com").unwrap();
//! assert_eq!(id.count_key(), "count:http://example.com");
//! assert_eq!(id.result_key(), "result:http://example.com");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{PageCacheError, Result};
pub use traits::*;
pub use types::*;
