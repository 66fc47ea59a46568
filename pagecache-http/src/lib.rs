//! HTTP page fetcher for PAGECACHE.
//!
//! Plain `GET` over `reqwest`, with a bounded timeout and strict status
//! handling: anything but a 2xx response is a failed fetch.

mod http;

pub use http::{HttpFetcher, HttpFetcherConfig};
