//! Test helpers: build AppState and router for integration tests.
//!
//! Metadata lives in memory and objects in a temporary local store. The delivery
//! cache fetches through [`SignedUrlFetcher`], which checks signatures and reads the
//! local store directly, so no network or database is needed.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use scholar_api::constants;
use scholar_api::setup::routes;
use scholar_api::state::{AppState, DocumentState};
use scholar_api::{DeliveryCache, DeliveryConfig, IngestService};
use scholar_core::{BaseConfig, Config, DocumentServiceConfig, StorageBackend};
use scholar_db::{DocumentMetadataStore, InMemoryDocumentStore};
use scholar_storage::{
    FetchError, LocalStorage, ObjectFetcher, Storage, UrlSigner, SIGNED_FILE_ROUTE,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BASE_URL: &str = "http://localhost:4000";
pub const SIGNING_SECRET: &str = "test-signing-secret-at-least-32-characters";
pub const MAX_DOCUMENT_SIZE: usize = 5 * 1024 * 1024;

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Resolves signed local URLs without a network round trip and counts fetches.
pub struct SignedUrlFetcher {
    storage: Arc<LocalStorage>,
    calls: AtomicUsize,
}

impl SignedUrlFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Split a signed URL into `(key, expires, signature)`.
pub fn parse_signed_url(url: &str) -> Option<(String, i64, String)> {
    let rest = url.strip_prefix(&format!("{}{}/", BASE_URL, SIGNED_FILE_ROUTE))?;
    let (path, query) = rest.split_once('?')?;
    let key = path
        .split('/')
        .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()).ok())
        .collect::<Option<Vec<_>>>()?
        .join("/");

    let mut expires = None;
    let mut signature = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("expires", value)) => expires = value.parse().ok(),
            Some(("signature", value)) => signature = Some(value.to_string()),
            _ => {}
        }
    }
    Some((key, expires?, signature?))
}

#[async_trait]
impl ObjectFetcher for SignedUrlFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (key, expires, signature) = parse_signed_url(url)
            .ok_or_else(|| FetchError::Request(format!("unexpected url {}", url)))?;
        self.storage
            .verify_signed(&key, expires, &signature)
            .map_err(|_| FetchError::Status(403))?;
        self.storage
            .download(&key)
            .await
            .map_err(|_| FetchError::Status(404))
    }
}

/// Test application: server plus handles on its collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<LocalStorage>,
    pub metadata: Arc<dyn DocumentMetadataStore>,
    pub fetcher: Arc<SignedUrlFetcher>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of stored objects under the storage root.
    pub fn stored_object_count(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                count(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        count(self.temp_dir.path())
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Arc::new(InMemoryDocumentStore::new())).await
}

/// Setup test app with the given metadata store and an isolated local store.
pub async fn setup_test_app_with(metadata: Arc<dyn DocumentMetadataStore>) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage = Arc::new(
        LocalStorage::new(
            temp_dir.path().to_path_buf(),
            BASE_URL.to_string(),
            UrlSigner::new(SIGNING_SECRET.as_bytes().to_vec()),
        )
        .await
        .expect("Failed to create local storage"),
    );

    let config = create_test_config(temp_dir.path().to_string_lossy().as_ref());

    let fetcher = Arc::new(SignedUrlFetcher {
        storage: storage.clone(),
        calls: AtomicUsize::new(0),
    });
    let delivery = DeliveryCache::new(
        metadata.clone(),
        storage.clone(),
        fetcher.clone(),
        DeliveryConfig {
            ttl: Duration::from_secs(config.cache_ttl_secs()),
            sweep_interval: Duration::from_secs(config.cache_sweep_interval_secs()),
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_secs()),
            max_entries: config.cache_max_entries(),
        },
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        documents: DocumentState {
            metadata: metadata.clone(),
            storage: storage.clone(),
            delivery,
            ingest: IngestService::new(storage.clone()),
            max_document_size: config.max_document_size_bytes(),
        },
        local_files: Some(storage.clone()),
        db_pool: None,
    });

    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        metadata,
        fetcher,
        temp_dir,
    }
}

fn create_test_config(storage_path: &str) -> Config {
    Config(Box::new(DocumentServiceConfig {
        base: BaseConfig {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 5,
            db_timeout_seconds: 30,
            environment: "test".to_string(),
        },
        database_url: None,
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: Some(storage_path.to_string()),
        public_base_url: BASE_URL.to_string(),
        url_signing_secret: Some(SIGNING_SECRET.to_string()),
        signed_url_ttl_secs: 3600,
        cache_ttl_secs: 1800,
        cache_sweep_interval_secs: 60,
        cache_max_entries: 64,
        fetch_timeout_secs: 30,
        max_document_size_bytes: MAX_DOCUMENT_SIZE,
    }))
}
