use bytes::Bytes;
use std::fmt;

/// A decompressed, ready-to-serve document held by the delivery cache.
///
/// Entries are never mutated after insertion; a refresh replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDocument {
    pub content_type: String,
    pub filename: String,
    pub data: Bytes,
}

/// Whether a delivery was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` response header.
    pub fn header_value(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}
