//! Document repository: metadata rows for uploaded documents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scholar_core::{AppError, DocumentRecord, StoredObjectKey};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::DocumentMetadataStore;

/// Row type for the documents table.
#[derive(Debug, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub file_path: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentRow {
    pub fn to_document(self) -> DocumentRecord {
        DocumentRecord {
            id: self.id.to_string(),
            owner_id: self.owner_id,
            title: self.title,
            file_path: StoredObjectKey::from_raw(self.file_path),
            content_type: self.content_type,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentMetadataStore for DocumentRepository {
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %id))]
    async fn find_document_path(&self, id: &str) -> Result<Option<DocumentRecord>, AppError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<Postgres, DocumentRow>(
            "SELECT id, owner_id, title, file_path, content_type, created_at FROM documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DocumentRow::to_document))
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "documents", db.record_id = %record.id))]
    async fn create_document(&self, record: &DocumentRecord) -> Result<(), AppError> {
        let id = Uuid::parse_str(&record.id)
            .map_err(|e| AppError::InvalidInput(format!("Invalid document id: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_id, title, file_path, content_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&record.owner_id)
        .bind(&record.title)
        .bind(record.file_path.as_str())
        .bind(&record.content_type)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %id))]
    async fn delete_document(&self, id: &str) -> Result<bool, AppError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
