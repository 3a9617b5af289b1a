//! Service initialization and application state setup

use crate::services::delivery::{DeliveryCache, DeliveryConfig};
use crate::services::ingest::IngestService;
use crate::setup::storage::StorageHandles;
use crate::state::{AppState, DocumentState};
use anyhow::{Context, Result};
use scholar_core::Config;
use scholar_db::{DocumentMetadataStore, DocumentRepository, InMemoryDocumentStore};
use scholar_storage::HttpFetcher;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Build the metadata store, fetcher, delivery cache and ingest service.
///
/// Must run inside a Tokio runtime: the cache sweeper is spawned here.
pub fn initialize_services(
    config: &Config,
    pool: Option<PgPool>,
    storage: StorageHandles,
) -> Result<Arc<AppState>> {
    let metadata: Arc<dyn DocumentMetadataStore> = match &pool {
        Some(pool) => Arc::new(DocumentRepository::new(pool.clone())),
        None => Arc::new(InMemoryDocumentStore::new()),
    };

    let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout_secs()))
        .context("Failed to create object fetcher")?;

    let delivery = DeliveryCache::new(
        metadata.clone(),
        storage.storage.clone(),
        Arc::new(fetcher),
        DeliveryConfig {
            ttl: Duration::from_secs(config.cache_ttl_secs()),
            sweep_interval: Duration::from_secs(config.cache_sweep_interval_secs()),
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_secs()),
            max_entries: config.cache_max_entries(),
        },
    );
    delivery.spawn_sweeper();

    tracing::info!(
        ttl_secs = config.cache_ttl_secs(),
        sweep_interval_secs = config.cache_sweep_interval_secs(),
        max_entries = config.cache_max_entries(),
        signed_url_ttl_secs = config.signed_url_ttl_secs(),
        "Delivery cache initialized"
    );

    let documents = DocumentState {
        metadata,
        ingest: IngestService::new(storage.storage.clone()),
        storage: storage.storage,
        delivery,
        max_document_size: config.max_document_size_bytes(),
    };

    Ok(Arc::new(AppState {
        config: config.clone(),
        documents,
        local_files: storage.local,
        db_pool: pool,
    }))
}
