use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use scholar_core::AppError;
use scholar_storage::Storage;
use std::sync::Arc;

/// Delete a document's object, cache entry and metadata row.
#[tracing::instrument(skip(state), fields(document_id = %id, operation = "delete_document"))]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    let documents = &state.documents;

    let record = documents
        .metadata
        .find_document_path(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    // Object delete is idempotent, so a retry after a partial failure succeeds.
    documents.storage.delete(record.file_path.as_str()).await?;
    documents.metadata.delete_document(&id).await?;
    // Last, so a load racing this delete finds no metadata once eviction is done.
    let evicted = documents.delivery.evict(&id).await;

    tracing::info!(
        key = %record.file_path,
        evicted,
        "Document deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
