//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All backends (S3, local filesystem) implement this trait so the pipeline never
/// couples to a specific store. Objects are opaque byte blobs; every read path for
/// clients goes through a short-lived signed URL rather than a public link.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `storage_key`, overwriting any existing object.
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Read an object directly, bypassing signed URLs.
    async fn download(&self, storage_key: &str) -> StorageResult<Bytes>;

    /// Delete an object. Deleting an absent key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Generate a URL that grants GET access to the object for `expires_in`.
    ///
    /// Does not check that the object exists and does not fetch it.
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
