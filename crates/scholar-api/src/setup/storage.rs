//! Storage setup and initialization

use anyhow::Result;
use scholar_core::{Config, StorageBackend};
use scholar_storage::{create_local_storage, create_storage, LocalStorage, Storage};
use std::sync::Arc;

/// The active backend, plus a typed handle when it is the local one.
pub struct StorageHandles {
    pub storage: Arc<dyn Storage>,
    /// Needed to verify signatures on the `/files` route.
    pub local: Option<Arc<LocalStorage>>,
}

pub async fn setup_storage(config: &Config) -> Result<StorageHandles> {
    tracing::info!("Initializing storage abstraction...");

    let handles = match config.storage_backend() {
        StorageBackend::Local => {
            let local = Arc::new(create_local_storage(config).await?);
            StorageHandles {
                storage: local.clone(),
                local: Some(local),
            }
        }
        StorageBackend::S3 => StorageHandles {
            storage: create_storage(config).await?,
            local: None,
        },
    };

    tracing::info!(
        backend = ?handles.storage.backend_type(),
        "Storage abstraction initialized successfully"
    );

    Ok(handles)
}
