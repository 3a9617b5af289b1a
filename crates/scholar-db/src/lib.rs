//! Scholar DB Library
//!
//! Document metadata persistence: the `DocumentMetadataStore` seam used by the
//! upload, retrieval and deletion paths, a Postgres implementation and an
//! in-memory one.

pub mod db;

pub use db::{DocumentMetadataStore, DocumentRepository, InMemoryDocumentStore};
