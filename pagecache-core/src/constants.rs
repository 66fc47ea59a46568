//! Constants shared by every PAGECACHE crate.
//!
//! Key prefixes define the layout of the shared store and must match across
//! every process that reads or writes it.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// STORE KEY LAYOUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix of the per-resource request counter key.
pub const COUNT_KEY_PREFIX: &str = "count:";

/// Prefix of the per-resource cached result key.
pub const RESULT_KEY_PREFIX: &str = "result:";

/// Separator used when a resource identifier is built from several arguments.
pub const COMPOSITE_SEPARATOR: &str = ":";

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifetime of a cached result, in seconds.
pub const RESULT_TTL_SECONDS: u64 = 10;

/// Lifetime of a cached result.
pub const RESULT_TTL: Duration = Duration::from_secs(RESULT_TTL_SECONDS);

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default timeout for a single page fetch, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// User agent sent with page fetches.
pub const DEFAULT_USER_AGENT: &str = concat!("pagecache/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_ttl_is_ten_seconds() {
        assert_eq!(RESULT_TTL, Duration::from_secs(10));
        assert_eq!(RESULT_TTL.as_secs(), RESULT_TTL_SECONDS);
    }

    #[test]
    fn test_prefixes_are_distinct() {
        assert_ne!(COUNT_KEY_PREFIX, RESULT_KEY_PREFIX);
        assert!(!COUNT_KEY_PREFIX.starts_with(RESULT_KEY_PREFIX));
        assert!(!RESULT_KEY_PREFIX.starts_with(COUNT_KEY_PREFIX));
    }
}
