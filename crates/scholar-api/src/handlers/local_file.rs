//! Signed file route for the local storage backend.
//!
//! Serves the raw stored object behind a URL minted by `LocalStorage::presigned_get_url`.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use scholar_core::constants::{GZIP_MIME, OCTET_STREAM_MIME};
use scholar_core::AppError;
use scholar_storage::Storage;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SignedFileQuery {
    pub expires: i64,
    pub signature: String,
}

#[tracing::instrument(skip(state, query), fields(key = %key, operation = "get_local_file"))]
pub async fn get_local_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedFileQuery>,
) -> Result<Response, HttpAppError> {
    let local = state
        .local_files
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    local.verify_signed(&key, query.expires, &query.signature)?;

    let data = local.download(&key).await?;
    let content_type = if key.ends_with(".gz") {
        GZIP_MIME
    } else {
        OCTET_STREAM_MIME
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}
