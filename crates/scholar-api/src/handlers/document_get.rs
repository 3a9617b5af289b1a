use crate::constants::X_CACHE_HEADER;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use scholar_core::AppError;
use std::sync::Arc;

/// Serve a stored document through the delivery cache.
#[tracing::instrument(skip(state), fields(document_id = %id, operation = "get_document"))]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, HttpAppError> {
    let delivery = &state.documents.delivery;
    let (document, status) = delivery.get(&id).await?;

    tracing::info!(
        cache = %status,
        size_bytes = document.data.len(),
        content_type = %document.content_type,
        "Serving document"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, document.content_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&document.filename),
        )
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", delivery.ttl().as_secs()),
        )
        .header(X_CACHE_HEADER, status.header_value())
        .body(Body::from(document.data.clone()))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}

/// `inline` disposition with an ASCII fallback name and, when needed, an RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if filename.is_ascii() && !filename.contains(['"', '\\']) {
        format!("inline; filename=\"{}\"", fallback)
    } else {
        format!(
            "inline; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename() {
        assert_eq!(
            content_disposition("Lecture 3.pdf"),
            "inline; filename=\"Lecture 3.pdf\""
        );
    }

    #[test]
    fn test_quotes_are_not_passed_through() {
        let value = content_disposition("a\"b.pdf");
        assert!(value.starts_with("inline; filename=\"a_b.pdf\""));
        assert!(value.contains("filename*=UTF-8''a%22b.pdf"));
    }

    #[test]
    fn test_non_ascii_filename_gets_utf8_form() {
        let value = content_disposition("Übung.pdf");
        assert!(value.starts_with("inline; filename=\"_bung.pdf\""));
        assert!(value.ends_with("filename*=UTF-8''%C3%9Cbung.pdf"));
        assert!(axum::http::HeaderValue::from_str(&value).is_ok());
    }
}
