use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use scholar_core::constants::{content_type_for_extension, OCTET_STREAM_MIME};
use scholar_core::{AppError, DocumentRecord, DocumentResponse, UploadedFile};
use scholar_storage::Storage;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    title: Option<String>,
    owner_id: Option<String>,
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map(|value| value.trim().to_string())
        .map_err(|e| AppError::InvalidInput(format!("Invalid form field: {}", e)))
}

async fn read_form(mut multipart: Multipart, max_size: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::InvalidInput("File name is required".to_string())
                    })?;
                let declared = match field.content_type() {
                    Some(ct) if ct != OCTET_STREAM_MIME => ct.to_string(),
                    _ => content_type_for_extension(
                        filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default(),
                    )
                    .to_string(),
                };
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {}", e)))?;
                if bytes.len() > max_size {
                    return Err(AppError::PayloadTooLarge(format!(
                        "{} bytes exceeds max {} bytes",
                        bytes.len(),
                        max_size
                    )));
                }
                form.file = Some(UploadedFile::new(bytes.to_vec(), filename, declared));
            }
            Some("title") => form.title = Some(read_text(field).await?),
            Some("owner_id") => form.owner_id = Some(read_text(field).await?),
            _ => {}
        }
    }

    Ok(form)
}

/// Accept a multipart upload (`file`, `title`, `owner_id`), run the ingest pipeline and
/// record the document. Metadata is written only after the object write succeeded.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_document"))]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), HttpAppError> {
    let documents = &state.documents;
    let form = read_form(multipart, documents.max_document_size).await?;

    let file = form
        .file
        .ok_or_else(|| AppError::InvalidInput("Missing 'file' field".to_string()))?;
    let owner_id = form
        .owner_id
        .filter(|owner| !owner.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing 'owner_id' field".to_string()))?;
    let title = form.title.filter(|title| !title.is_empty()).unwrap_or_else(|| {
        match file.display_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file.display_name.clone(),
        }
    });

    let ingested = documents.ingest.ingest(file, &owner_id).await?;

    let record = DocumentRecord {
        id: Uuid::new_v4().to_string(),
        owner_id,
        title,
        file_path: ingested.key,
        content_type: ingested.media_type,
        created_at: Utc::now(),
    };

    if let Err(e) = documents.metadata.create_document(&record).await {
        // Leave no orphaned object behind a failed insert.
        let storage = documents.storage.clone();
        let storage_key = record.file_path.clone();
        tokio::spawn(async move {
            if let Err(cleanup_err) = storage.delete(storage_key.as_str()).await {
                tracing::warn!(
                    error = %cleanup_err,
                    key = %storage_key,
                    "Failed to clean up stored object after metadata error"
                );
            }
        });
        return Err(e.into());
    }

    tracing::info!(
        document_id = %record.id,
        key = %record.file_path,
        size_bytes = ingested.stored_bytes,
        "Document uploaded"
    );

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(record))))
}
