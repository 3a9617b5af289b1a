//! Health check handler.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use scholar_storage::Storage;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(CHECK_TIMEOUT, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub cached_documents: usize,
}

pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match &state.db_pool {
        Some(pool) => {
            run_check(
                async { sqlx::query("SELECT 1").execute(pool).await.map(|_| ()) },
                "unhealthy",
            )
            .await
        }
        None => "in_memory".to_string(),
    };

    let healthy = database == "healthy" || database == "in_memory";
    let status = if healthy {
        StatusCode::OK
    } else {
        tracing::warn!(database = %database, "Health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        database,
        storage: state.documents.storage.backend_type().to_string(),
        cached_documents: state.documents.delivery.len().await,
    };

    (status, Json(body))
}
