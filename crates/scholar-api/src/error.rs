//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Pipeline errors convert
//! into `AppError` first, so every failure renders with the same JSON shape, status
//! code and log level.

use crate::services::delivery::DeliveryError;
use crate::services::ingest::IngestError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scholar_core::{AppError, ErrorMetadata, LogLevel};
use scholar_processing::{ConversionError, DecodeError};
use scholar_storage::{FetchError, SignatureError, StorageError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from scholar-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details are hidden in production, and always for sensitive errors.
        let show_details = !is_production_env() && !app_error.is_sensitive();
        let body = ErrorResponse {
            error: app_error.client_message(),
            details: show_details.then(|| app_error.detailed_message()),
            error_type: show_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

// Domain errors convert through AppError (orphan rule: impls live on the local wrapper).

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::UploadFailed(msg) => AppError::Upload(msg),
            StorageError::DownloadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::BackendError(msg) => AppError::Storage(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<ConversionError> for HttpAppError {
    fn from(err: ConversionError) -> Self {
        HttpAppError(AppError::Conversion(err.to_string()))
    }
}

impl From<DecodeError> for HttpAppError {
    fn from(err: DecodeError) -> Self {
        HttpAppError(AppError::Decode(err.to_string()))
    }
}

impl From<FetchError> for HttpAppError {
    fn from(err: FetchError) -> Self {
        HttpAppError(AppError::Storage(err.to_string()))
    }
}

impl From<SignatureError> for HttpAppError {
    fn from(err: SignatureError) -> Self {
        HttpAppError(AppError::Forbidden(err.to_string()))
    }
}

impl From<IngestError> for HttpAppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::EmptyFile => {
                HttpAppError(AppError::InvalidInput("File is empty".to_string()))
            }
            IngestError::Conversion(e) => e.into(),
            IngestError::Upload(e) => HttpAppError(AppError::Upload(e.to_string())),
            IngestError::Task(msg) => HttpAppError(AppError::Internal(msg)),
        }
    }
}

impl From<DeliveryError> for HttpAppError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::NotFound(_) => {
                HttpAppError(AppError::NotFound("Document not found".to_string()))
            }
            DeliveryError::Metadata(e) => HttpAppError(e),
            DeliveryError::Signing(e) => HttpAppError(AppError::Storage(e.to_string())),
            DeliveryError::Fetch(e) => e.into(),
            DeliveryError::Decode(e) => e.into(),
            DeliveryError::Task(msg) => HttpAppError(AppError::Internal(msg)),
        }
    }
}
