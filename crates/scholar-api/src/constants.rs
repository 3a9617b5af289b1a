//! API constants

/// Versioned prefix for all document routes.
pub const API_PREFIX: &str = "/api/v0";

/// Response header reporting whether a document came from the delivery cache.
pub const X_CACHE_HEADER: &str = "x-cache";

/// Multipart overhead allowed on top of the maximum document size.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
