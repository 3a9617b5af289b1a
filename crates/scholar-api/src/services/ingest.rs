//! Upload pipeline: classify, normalize, compress, store.

use bytes::Bytes;
use scholar_core::constants::GZIP_MIME;
use scholar_core::{StoredObjectKey, UploadedFile};
use scholar_processing::{classify, compress, ConversionError, DocumentNormalizer};
use scholar_storage::{document_key, Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Failed to store document: {0}")]
    Upload(#[source] StorageError),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result of a successful ingest. The object is written; no metadata exists yet.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub key: StoredObjectKey,
    pub display_name: String,
    pub media_type: String,
    pub stored_bytes: usize,
}

#[derive(Clone)]
pub struct IngestService {
    storage: Arc<dyn Storage>,
    normalizer: DocumentNormalizer,
}

impl IngestService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_normalizer(storage, DocumentNormalizer::default())
    }

    pub fn with_normalizer(storage: Arc<dyn Storage>, normalizer: DocumentNormalizer) -> Self {
        Self {
            storage,
            normalizer,
        }
    }

    /// Normalize `file`, compress it and write it under a fresh key for `owner_id`.
    ///
    /// Accepts multipart uploads and files read from disk. Nothing is written when
    /// conversion fails.
    pub async fn ingest(
        &self,
        file: impl Into<UploadedFile>,
        owner_id: &str,
    ) -> Result<IngestedDocument, IngestError> {
        self.ingest_upload(file.into(), owner_id).await
    }

    #[tracing::instrument(
        skip(self, file),
        fields(filename = %file.display_name, media_type = %file.declared_media_type)
    )]
    async fn ingest_upload(
        &self,
        file: UploadedFile,
        owner_id: &str,
    ) -> Result<IngestedDocument, IngestError> {
        if file.bytes.is_empty() {
            return Err(IngestError::EmptyFile);
        }

        let class = classify(&file.declared_media_type, &file.display_name);
        let source_bytes = file.bytes.len();
        let normalizer = self.normalizer.clone();

        let (normalized, compressed) = tokio::task::spawn_blocking(move || {
            let normalized = normalizer.normalize(&file, class)?;
            let compressed = compress(&normalized.bytes);
            Ok::<_, ConversionError>((normalized, compressed))
        })
        .await
        .map_err(|e| IngestError::Task(e.to_string()))??;

        let key = document_key(owner_id, &normalized.display_name);
        let stored_bytes = compressed.len();

        self.storage
            .put(key.as_str(), Bytes::from(compressed), GZIP_MIME)
            .await
            .map_err(IngestError::Upload)?;

        tracing::info!(
            key = %key,
            class = ?class,
            source_bytes,
            normalized_bytes = normalized.bytes.len(),
            size_bytes = stored_bytes,
            "Document ingested"
        );

        Ok(IngestedDocument {
            key,
            display_name: normalized.display_name,
            media_type: normalized.media_type,
            stored_bytes,
        })
    }
}
