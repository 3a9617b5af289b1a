//! Key generation for stored documents.

use chrono::Utc;
use scholar_core::StoredObjectKey;

/// Key for a new upload by `owner_id`, stamped with the current time in milliseconds.
pub fn document_key(owner_id: &str, filename: &str) -> StoredObjectKey {
    StoredObjectKey::derive(owner_id, filename, Utc::now().timestamp_millis())
}

/// Reject keys that could escape a backend's namespace.
pub(crate) fn validate_key(storage_key: &str) -> bool {
    !storage_key.is_empty()
        && !storage_key.starts_with('/')
        && !storage_key.split('/').any(|segment| segment == "..")
}
