use crate::constants::{content_type_for_extension, COMPRESSED_SUFFIX, DOCUMENT_KEY_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of a document's bytes in the object store.
///
/// Layout: `documents/{owner_id}/{epoch_millis}-{filename}.gz`. The timestamp keeps
/// re-uploads of the same filename by the same owner distinct. This key is the only
/// durable link between a metadata record and its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredObjectKey(String);

impl StoredObjectKey {
    /// Build the key for a new upload.
    pub fn derive(owner_id: &str, filename: &str, epoch_millis: i64) -> Self {
        Self(format!(
            "{}/{}/{}-{}{}",
            DOCUMENT_KEY_PREFIX,
            sanitize_segment(owner_id),
            epoch_millis,
            sanitize_segment(filename),
            COMPRESSED_SUFFIX
        ))
    }

    /// Wrap a key read back from the metadata store.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_compressed(&self) -> bool {
        self.0.ends_with(COMPRESSED_SUFFIX)
    }

    /// Last path segment with the compression suffix removed.
    pub fn inner_name(&self) -> &str {
        let name = self.0.rsplit('/').next().unwrap_or(&self.0);
        name.strip_suffix(COMPRESSED_SUFFIX).unwrap_or(name)
    }

    /// Extension of the stored content, read after stripping the compression suffix.
    pub fn inner_extension(&self) -> Option<&str> {
        self.inner_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// Content type of the decompressed payload.
    pub fn content_type(&self) -> &'static str {
        content_type_for_extension(self.inner_extension().unwrap_or_default())
    }
}

impl fmt::Display for StoredObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoredObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keep a user-supplied value from adding path segments to a key.
fn sanitize_segment(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
