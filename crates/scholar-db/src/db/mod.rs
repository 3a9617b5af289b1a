//! Database repositories for document metadata
//
// Postgres-backed repository
pub mod document;
//
// Process-local store for tests and database-less development
pub mod memory;

pub use document::DocumentRepository;
pub use memory::InMemoryDocumentStore;

use async_trait::async_trait;
use scholar_core::{AppError, DocumentRecord};

/// Lookup and lifecycle of document metadata rows.
///
/// Document ids are opaque strings at this boundary; an id the backing store
/// cannot interpret is simply not found.
#[async_trait]
pub trait DocumentMetadataStore: Send + Sync {
    /// Resolve a document id to its record (title and stored object key).
    async fn find_document_path(&self, id: &str) -> Result<Option<DocumentRecord>, AppError>;

    /// Persist a new record. Called only after the object write succeeded.
    async fn create_document(&self, record: &DocumentRecord) -> Result<(), AppError>;

    /// Remove a record, returning whether one existed.
    async fn delete_document(&self, id: &str) -> Result<bool, AppError>;
}
