//! Read-through delivery cache for stored documents.
//!
//! A miss resolves the document through the metadata store, mints a signed URL,
//! fetches the raw object, decompresses it and infers its content type from the
//! stored key. Entries live for a fixed TTL from insertion and are swept by a
//! background task; past `max_entries` the least recently served document is
//! dropped. Concurrent misses for one document share a single fetch.

use lru::LruCache;
use scholar_core::{AppError, CacheStatus, CachedDocument};
use scholar_db::DocumentMetadataStore;
use scholar_processing::{decompress, DecodeError};
use scholar_storage::{FetchError, ObjectFetcher, Storage, StorageError};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Metadata lookup failed: {0}")]
    Metadata(#[from] AppError),

    #[error("Failed to sign retrieval URL: {0}")]
    Signing(#[from] StorageError),

    #[error("Failed to fetch stored object: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to decode stored object: {0}")]
    Decode(#[from] DecodeError),

    #[error("Background task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy)]
pub struct DeliveryConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
    pub signed_url_ttl: Duration,
    pub max_entries: usize,
}

struct CacheEntry {
    document: Arc<CachedDocument>,
    inserted_at: Instant,
}

struct DeliveryInner {
    entries: RwLock<LruCache<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    metadata: Arc<dyn DocumentMetadataStore>,
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn ObjectFetcher>,
    config: DeliveryConfig,
}

/// Cheap to clone; clones share entries and in-flight fetches.
#[derive(Clone)]
pub struct DeliveryCache {
    inner: Arc<DeliveryInner>,
}

/// Holds a per-document fetch lock and drops the map slot once nobody else waits on it.
struct FlightGuard<'a> {
    inner: &'a DeliveryInner,
    document_id: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut in_flight) = self.inner.in_flight.lock() else {
            return;
        };
        let idle = in_flight
            .get(self.document_id)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) <= 2);
        if idle {
            in_flight.remove(self.document_id);
        }
    }
}

impl DeliveryCache {
    pub fn new(
        metadata: Arc<dyn DocumentMetadataStore>,
        storage: Arc<dyn Storage>,
        fetcher: Arc<dyn ObjectFetcher>,
        config: DeliveryConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(DeliveryInner {
                entries: RwLock::new(LruCache::new(capacity)),
                in_flight: Mutex::new(HashMap::new()),
                metadata,
                storage,
                fetcher,
                config,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.config.ttl
    }

    /// Serve a document, from the cache when possible.
    #[tracing::instrument(skip_all, fields(document_id = %document_id))]
    pub async fn get(
        &self,
        document_id: &str,
    ) -> Result<(Arc<CachedDocument>, CacheStatus), DeliveryError> {
        if let Some(document) = self.lookup(document_id).await {
            return Ok((document, CacheStatus::Hit));
        }

        let flight = self.join_flight(document_id);
        let _held = flight.lock.lock().await;

        // Another request may have filled the entry while we waited.
        if let Some(document) = self.lookup(document_id).await {
            return Ok((document, CacheStatus::Hit));
        }

        let start = std::time::Instant::now();
        let document = Arc::new(self.load(document_id).await?);

        let displaced = self.inner.entries.write().await.push(
            document_id.to_string(),
            CacheEntry {
                document: document.clone(),
                inserted_at: Instant::now(),
            },
        );
        if let Some((evicted_id, _)) = displaced.filter(|(id, _)| id != document_id) {
            tracing::debug!(
                evicted_id = %evicted_id,
                "Delivery cache full, dropped least recently used document"
            );
        }

        tracing::info!(
            size_bytes = document.data.len(),
            content_type = %document.content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Document loaded into delivery cache"
        );

        Ok((document, CacheStatus::Miss))
    }

    /// Drop a cached document. Returns whether an entry was present.
    ///
    /// Waits for an in-flight load of the same document, so that load cannot
    /// re-insert the entry afterwards.
    pub async fn evict(&self, document_id: &str) -> bool {
        let flight = self.join_flight(document_id);
        let _held = flight.lock.lock().await;
        self.inner
            .entries
            .write()
            .await
            .pop(document_id)
            .is_some()
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn sweep(&self) -> usize {
        let ttl = self.inner.config.ttl;
        let mut entries = self.inner.entries.write().await;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            entries.pop(id);
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }

    /// Start the periodic expiry sweep.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let cache = self.clone();
        let period = self.inner.config.sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = cache.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired documents from delivery cache");
                }
            }
        })
    }

    async fn lookup(&self, document_id: &str) -> Option<Arc<CachedDocument>> {
        // A hit refreshes recency, so this takes the write lock.
        let mut entries = self.inner.entries.write().await;
        entries
            .get(document_id)
            .filter(|entry| entry.inserted_at.elapsed() < self.inner.config.ttl)
            .map(|entry| entry.document.clone())
    }

    fn join_flight<'a>(&'a self, document_id: &'a str) -> FlightGuard<'a> {
        let lock = match self.inner.in_flight.lock() {
            Ok(mut in_flight) => in_flight
                .entry(document_id.to_string())
                .or_default()
                .clone(),
            // A poisoned map only loses de-duplication, not correctness.
            Err(_) => Arc::new(tokio::sync::Mutex::new(())),
        };
        FlightGuard {
            inner: &self.inner,
            document_id,
            lock,
        }
    }

    async fn load(&self, document_id: &str) -> Result<CachedDocument, DeliveryError> {
        let record = self
            .inner
            .metadata
            .find_document_path(document_id)
            .await?
            .ok_or_else(|| DeliveryError::NotFound(document_id.to_string()))?;
        let key = &record.file_path;

        let url = self
            .inner
            .storage
            .presigned_get_url(key.as_str(), self.inner.config.signed_url_ttl)
            .await?;
        let raw = self.inner.fetcher.fetch(&url).await?;

        let data = if key.is_compressed() {
            let compressed_len = raw.len();
            let decoded = tokio::task::spawn_blocking(move || decompress(&raw))
                .await
                .map_err(|e| DeliveryError::Task(e.to_string()))??;
            tracing::debug!(
                key = %key,
                compressed_bytes = compressed_len,
                size_bytes = decoded.len(),
                "Decompressed stored document"
            );
            bytes::Bytes::from(decoded)
        } else {
            raw
        };

        Ok(CachedDocument {
            content_type: key.content_type().to_string(),
            filename: record.display_filename(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{record, MemoryStorage, StorageFetcher};
    use scholar_core::constants::{OCTET_STREAM_MIME, PDF_MIME, WORD_MIME};
    use scholar_core::StoredObjectKey;
    use scholar_db::InMemoryDocumentStore;
    use scholar_processing::compress;

    struct Fixture {
        cache: DeliveryCache,
        metadata: Arc<InMemoryDocumentStore>,
        storage: Arc<MemoryStorage>,
        fetcher: Arc<StorageFetcher>,
    }

    fn fixture(fetch_delay: Duration) -> Fixture {
        fixture_with_capacity(fetch_delay, 16)
    }

    fn fixture_with_capacity(fetch_delay: Duration, max_entries: usize) -> Fixture {
        let metadata = Arc::new(InMemoryDocumentStore::new());
        let storage = Arc::new(MemoryStorage::default());
        let fetcher = Arc::new(StorageFetcher::new(storage.clone()).with_delay(fetch_delay));
        let cache = DeliveryCache::new(
            metadata.clone(),
            storage.clone(),
            fetcher.clone(),
            DeliveryConfig {
                ttl: Duration::from_secs(1800),
                sweep_interval: Duration::from_secs(60),
                signed_url_ttl: Duration::from_secs(3600),
                max_entries,
            },
        );
        Fixture {
            cache,
            metadata,
            storage,
            fetcher,
        }
    }

    async fn seed(f: &Fixture, id: &str, key: &str, stored: &[u8]) {
        f.storage.insert(key, stored).await;
        f.metadata
            .create_document(&record(id, "Week 1", key))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_miss_then_hit_fetches_once() {
        let f = fixture(Duration::ZERO);
        let body = b"%PDF-1.5 lecture".to_vec();
        seed(&f, "doc1", "documents/u1/1700000000-week1.pdf.gz", &compress(&body)).await;

        let (first, status) = f.cache.get("doc1").await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(first.data.as_ref(), body.as_slice());
        assert_eq!(first.content_type, PDF_MIME);
        assert_eq!(first.filename, "Week 1.pdf");

        let (second, status) = f.cache.get("doc1").await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(f.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_content_type_from_inner_extension() {
        let f = fixture(Duration::ZERO);
        seed(&f, "doc1", "documents/u1/1700000000-report.docx.gz", &compress(b"PK")).await;

        let (document, _) = f.cache.get("doc1").await.unwrap();
        assert_eq!(document.content_type, WORD_MIME);
        assert_eq!(document.filename, "Week 1.docx");
    }

    #[tokio::test]
    async fn test_uncompressed_key_served_as_is() {
        let f = fixture(Duration::ZERO);
        seed(&f, "doc1", "documents/u1/1-blob.bin", b"raw bytes").await;

        let (document, _) = f.cache.get("doc1").await.unwrap();
        assert_eq!(document.data.as_ref(), b"raw bytes");
        assert_eq!(document.content_type, OCTET_STREAM_MIME);
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let f = fixture(Duration::ZERO);
        assert!(matches!(
            f.cache.get("missing").await,
            Err(DeliveryError::NotFound(_))
        ));
        assert_eq!(f.fetcher.calls(), 0);
        assert!(f.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_decode_failure_leaves_cache_untouched() {
        let f = fixture(Duration::ZERO);
        seed(&f, "doc1", "documents/u1/1-notes.pdf.gz", b"not gzip at all").await;

        assert!(matches!(
            f.cache.get("doc1").await,
            Err(DeliveryError::Decode(_))
        ));
        assert!(f.cache.is_empty().await);

        // Nothing was cached, so the next request fetches again.
        assert!(f.cache.get("doc1").await.is_err());
        assert_eq!(f.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_object_is_fetch_error() {
        let f = fixture(Duration::ZERO);
        f.metadata
            .create_document(&record("doc1", "Week 1", "documents/u1/1-gone.pdf.gz"))
            .await
            .unwrap();

        assert!(matches!(
            f.cache.get("doc1").await,
            Err(DeliveryError::Fetch(FetchError::Status(404)))
        ));
    }

    #[tokio::test]
    async fn test_evict_forces_refetch() {
        let f = fixture(Duration::ZERO);
        seed(&f, "doc1", "documents/u1/1-notes.pdf.gz", &compress(b"v1")).await;

        f.cache.get("doc1").await.unwrap();
        assert!(f.cache.evict("doc1").await);
        assert!(!f.cache.evict("doc1").await);

        let (_, status) = f.cache.get("doc1").await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(f.fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_waits_for_in_flight_load() {
        let f = fixture(Duration::from_millis(100));
        let key = "documents/u1/1-notes.pdf";
        seed(&f, "doc1", key, b"%PDF").await;

        let cache = f.cache.clone();
        let load = tokio::spawn(async move { cache.get("doc1").await.map(|(_, status)| status) });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Delete while the fetch is still running.
        f.storage.delete(key).await.unwrap();
        f.metadata.delete_document("doc1").await.unwrap();
        assert!(f.cache.evict("doc1").await);

        assert_eq!(load.await.unwrap().unwrap(), CacheStatus::Miss);
        assert!(f.cache.is_empty().await);
        assert!(matches!(
            f.cache.get("doc1").await,
            Err(DeliveryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_capacity_drops_least_recently_served() {
        let f = fixture_with_capacity(Duration::ZERO, 2);
        seed(&f, "doc1", "documents/u1/1-a.pdf", b"%PDF a").await;
        seed(&f, "doc2", "documents/u1/2-b.pdf", b"%PDF b").await;
        seed(&f, "doc3", "documents/u1/3-c.pdf", b"%PDF c").await;

        f.cache.get("doc1").await.unwrap();
        f.cache.get("doc2").await.unwrap();
        // Touch doc1 so doc2 is the oldest.
        assert_eq!(f.cache.get("doc1").await.unwrap().1, CacheStatus::Hit);
        f.cache.get("doc3").await.unwrap();

        assert_eq!(f.cache.len().await, 2);
        assert_eq!(f.cache.get("doc1").await.unwrap().1, CacheStatus::Hit);
        assert_eq!(f.cache.get("doc2").await.unwrap().1, CacheStatus::Miss);
        assert_eq!(f.fetcher.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let f = fixture(Duration::ZERO);
        seed(&f, "doc1", "documents/u1/1-notes.pdf", b"%PDF").await;

        f.cache.get("doc1").await.unwrap();

        tokio::time::advance(Duration::from_secs(1799)).await;
        let (_, status) = f.cache.get("doc1").await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(f.cache.sweep().await, 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(f.cache.sweep().await, 1);
        assert!(f.cache.is_empty().await);

        let (_, status) = f.cache.get("doc1").await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(f.fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_a_miss_before_sweep() {
        let f = fixture(Duration::ZERO);
        seed(&f, "doc1", "documents/u1/1-notes.pdf", b"%PDF").await;

        f.cache.get("doc1").await.unwrap();
        tokio::time::advance(Duration::from_secs(1801)).await;

        let (_, status) = f.cache.get("doc1").await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let f = fixture(Duration::from_millis(50));
        seed(&f, "doc1", "documents/u1/1-notes.pdf.gz", &compress(b"%PDF")).await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let cache = f.cache.clone();
            tasks.spawn(async move { cache.get("doc1").await.map(|(_, status)| status) });
        }

        let mut misses = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap().unwrap() == CacheStatus::Miss {
                misses += 1;
            }
        }

        assert_eq!(misses, 1);
        assert_eq!(f.fetcher.calls(), 1);
        assert!(f.cache.inner.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_key_is_used_verbatim() {
        let f = fixture(Duration::ZERO);
        let key = StoredObjectKey::derive("u1", "slides.pptx", 1_700_000_000_000);
        seed(&f, "doc1", key.as_str(), &compress(b"PK")).await;

        let (document, _) = f.cache.get("doc1").await.unwrap();
        assert_eq!(document.filename, "Week 1.pptx");
    }
}
