use async_trait::async_trait;
use scholar_core::{AppError, DocumentRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::DocumentMetadataStore;

/// Metadata store held in process memory. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    records: Arc<RwLock<HashMap<String, DocumentRecord>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentMetadataStore for InMemoryDocumentStore {
    async fn find_document_path(&self, id: &str) -> Result<Option<DocumentRecord>, AppError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn create_document(&self, record: &DocumentRecord) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(AppError::InvalidInput(format!(
                "Document {} already exists",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scholar_core::StoredObjectKey;

    fn record(id: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            owner_id: "u1".to_string(),
            title: "Week 1".to_string(),
            file_path: StoredObjectKey::derive("u1", "week1.pdf", 1_700_000_000_000),
            content_type: "application/pdf".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let store = InMemoryDocumentStore::new();
        store.create_document(&record("a")).await.unwrap();

        let found = store.find_document_path("a").await.unwrap().unwrap();
        assert_eq!(found.title, "Week 1");
        assert_eq!(
            found.file_path.as_str(),
            "documents/u1/1700000000000-week1.pdf.gz"
        );
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let store = InMemoryDocumentStore::new();
        assert!(store.find_document_path("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryDocumentStore::new();
        store.create_document(&record("a")).await.unwrap();
        assert!(store.create_document(&record("a")).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = InMemoryDocumentStore::new();
        store.create_document(&record("a")).await.unwrap();

        assert!(store.delete_document("a").await.unwrap());
        assert!(!store.delete_document("a").await.unwrap());
        assert!(store.is_empty().await);
    }
}
