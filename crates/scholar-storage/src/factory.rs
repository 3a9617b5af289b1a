#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
#[cfg(feature = "storage-local")]
use crate::UrlSigner;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use scholar_core::Config;
use std::sync::Arc;

/// Create the S3 backend from configuration.
#[cfg(feature = "storage-s3")]
pub async fn create_s3_storage(config: &Config) -> StorageResult<S3Storage> {
    let bucket = config
        .s3_bucket()
        .map(String::from)
        .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
    let region = config
        .s3_region()
        .map(String::from)
        .or_else(|| config.aws_region().map(String::from))
        .ok_or_else(|| {
            StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
        })?;
    let endpoint = config.s3_endpoint().map(String::from);

    S3Storage::new(bucket, region, endpoint).await
}

/// Create the local filesystem backend from configuration.
#[cfg(feature = "storage-local")]
pub async fn create_local_storage(config: &Config) -> StorageResult<LocalStorage> {
    let base_path = config
        .local_storage_path()
        .map(String::from)
        .ok_or_else(|| StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string()))?;
    let secret = config.url_signing_secret().ok_or_else(|| {
        StorageError::ConfigError("URL_SIGNING_SECRET not configured".to_string())
    })?;

    LocalStorage::new(
        base_path,
        config.public_base_url().to_string(),
        UrlSigner::new(secret.as_bytes().to_vec()),
    )
    .await
}

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => Ok(Arc::new(create_s3_storage(config).await?)),

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => Ok(Arc::new(create_local_storage(config).await?)),

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
