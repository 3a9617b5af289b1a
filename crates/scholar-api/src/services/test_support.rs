//! In-memory collaborators shared by service tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use scholar_core::{DocumentRecord, StorageBackend, StoredObjectKey};
use scholar_storage::{FetchError, ObjectFetcher, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const URL_SCHEME: &str = "memory://";

/// Object store held in a map. Presigned URLs are `memory://{key}`.
#[derive(Default)]
pub(crate) struct MemoryStorage {
    objects: RwLock<HashMap<String, (Bytes, String)>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub(crate) fn failing() -> Self {
        Self {
            objects: RwLock::default(),
            fail_writes: true,
        }
    }

    pub(crate) async fn insert(&self, key: &str, data: &[u8]) {
        self.objects.write().await.insert(
            key.to_string(),
            (Bytes::copy_from_slice(data), "application/gzip".to_string()),
        );
    }

    pub(crate) async fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects.read().await.get(key).map(|(_, ct)| ct.clone())
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        if self.fail_writes {
            return Err(StorageError::UploadFailed("bucket unavailable".to_string()));
        }
        self.objects
            .write()
            .await
            .insert(storage_key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        self.objects
            .read()
            .await
            .get(storage_key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(storage_key);
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!("{}{}", URL_SCHEME, storage_key))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Resolves `memory://` URLs against a [`MemoryStorage`] and counts calls.
pub(crate) struct StorageFetcher {
    storage: Arc<MemoryStorage>,
    calls: AtomicUsize,
    delay: Duration,
}

impl StorageFetcher {
    pub(crate) fn new(storage: Arc<MemoryStorage>) -> Self {
        Self {
            storage,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectFetcher for StorageFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| FetchError::Request(format!("unexpected url {}", url)))?;
        let body = self
            .storage
            .download(key)
            .await
            .map_err(|_| FetchError::Status(404))?;
        // The body is read up front; the delay stands in for transfer time.
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(body)
    }
}

pub(crate) fn record(id: &str, title: &str, key: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        owner_id: "u1".to_string(),
        title: title.to_string(),
        file_path: StoredObjectKey::from_raw(key),
        content_type: "application/pdf".to_string(),
        created_at: Utc::now(),
    }
}

/// Smallest `.docx` the Word converter accepts: one paragraph of `text`.
pub(crate) fn minimal_docx(text: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    writer.start_file("word/document.xml", options).unwrap();
    writer
        .write_all(
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
                 <w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
                text
            )
            .as_bytes(),
        )
        .unwrap();
    writer.finish().unwrap().into_inner()
}
