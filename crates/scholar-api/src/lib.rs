//! Scholar API Library
//!
//! HTTP surface of the document pipeline: upload, cached retrieval, deletion and
//! the signed file route used by the local storage backend.

pub mod constants;
pub mod error;
mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use services::delivery::{DeliveryCache, DeliveryConfig, DeliveryError};
pub use services::ingest::{IngestError, IngestService, IngestedDocument};
