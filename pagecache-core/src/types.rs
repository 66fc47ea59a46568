//! Domain types for PAGECACHE.
//!
//! - [`ResourceId`]: a validated, non-blank resource identifier (usually a URL)
//!
//! Every identifier maps to two store keys: a request counter under
//! `count:<id>` and a cached result under `result:<id>`. The identifier is
//! used verbatim, so `"http://a"` and `" http://a"` are distinct resources.

use std::fmt;

use crate::constants::{COMPOSITE_SEPARATOR, COUNT_KEY_PREFIX, RESULT_KEY_PREFIX};
use crate::error::{PageCacheError, Result};

/// A non-blank resource identifier.
///
/// Construction is the only validation point: a `ResourceId` never holds an
/// empty or whitespace-only string, so nothing keyed on it can be written
/// for a blank identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    /// Validates a raw identifier.
    ///
    /// Returns `None` when the input is empty after trimming whitespace.
    /// The input is kept untrimmed when valid.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    /// Builds an identifier from several call arguments joined with `:`.
    ///
    /// Returns `None` when the joined result is blank.
    pub fn composite<S: AsRef<str>>(parts: &[S]) -> Option<Self> {
        let joined = parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(COMPOSITE_SEPARATOR);
        Self::parse(&joined)
    }

    /// Returns the identifier as given by the caller.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the request counter for this resource.
    pub fn count_key(&self) -> String {
        format!("{}{}", COUNT_KEY_PREFIX, self.0)
    }

    /// Key of the cached result for this resource.
    pub fn result_key(&self) -> String {
        format!("{}{}", RESULT_KEY_PREFIX, self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Decodes a counter stored as decimal ASCII.
pub fn parse_counter(key: &str, raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| PageCacheError::corrupt_entry(key, "value is not an integer"))
}
