//! Application state shared by all handlers.
//!
//! Storage, fetcher, metadata store and delivery cache are built once at startup
//! (see `setup::services`) and injected here.

use crate::services::delivery::DeliveryCache;
use crate::services::ingest::IngestService;
use scholar_core::Config;
use scholar_db::DocumentMetadataStore;
use scholar_storage::{LocalStorage, Storage};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct DocumentState {
    pub metadata: Arc<dyn DocumentMetadataStore>,
    pub storage: Arc<dyn Storage>,
    pub delivery: DeliveryCache,
    pub ingest: IngestService,
    pub max_document_size: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub documents: DocumentState,
    /// Set when the local backend is active; serves `/files/{*key}`.
    pub local_files: Option<Arc<LocalStorage>>,
    /// `None` when metadata lives in memory.
    pub db_pool: Option<PgPool>,
}
