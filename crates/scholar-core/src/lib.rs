//! Scholar Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! the ingestion pipeline, the storage gateway and the HTTP API.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, DocumentServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    CacheStatus, CachedDocument, DiskFile, DocumentRecord, DocumentResponse, FileSource,
    NormalizedDocument, StoredObjectKey, UploadedFile,
};
pub use storage_types::StorageBackend;
