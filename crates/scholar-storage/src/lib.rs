//! Scholar Storage Library
//!
//! Object store gateway for normalized documents: the `Storage` trait with S3 and
//! local filesystem backends, key derivation, signed retrieval URLs and the HTTP
//! fetcher used to read objects back through those URLs.
//!
//! # Storage key format
//!
//! `documents/{owner_id}/{epoch_millis}-{filename}.gz`. Keys must not contain `..`
//! segments or a leading `/`. Key generation lives in the `keys` module so every
//! backend stays consistent.

pub mod factory;
pub mod fetch;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use factory::create_local_storage;
#[cfg(feature = "storage-s3")]
pub use factory::create_s3_storage;
pub use fetch::{FetchError, HttpFetcher, ObjectFetcher};
pub use keys::document_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use scholar_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::{SignatureError, UrlSigner, SIGNED_FILE_ROUTE};
pub use traits::{Storage, StorageError, StorageResult};
