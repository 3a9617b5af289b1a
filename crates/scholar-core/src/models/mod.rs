//! Domain models for the ingestion and delivery pipeline.

pub mod cache;
pub mod document;
pub mod file;
pub mod key;

pub use cache::{CacheStatus, CachedDocument};
pub use document::{DocumentRecord, DocumentResponse};
pub use file::{DiskFile, FileSource, NormalizedDocument, UploadedFile};
pub use key::StoredObjectKey;
