//! Configuration validation
//!
//! Checks run at startup on top of `Config::validate`, for settings that are only
//! wrong in combination with the deployment environment.

use anyhow::Result;
use scholar_core::Config;

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() {
        if config.cors_origins().iter().any(|origin| origin == "*") {
            return Err(anyhow::anyhow!(
                "CORS configured to allow all origins (*) in production. \
                Please set specific allowed origins via CORS_ORIGINS."
            ));
        }
        if config.database_url().is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be set in production; in-memory metadata does not survive restarts"
            ));
        }
    }

    if config.db_max_connections() == 0 {
        return Err(anyhow::anyhow!("Database max connections cannot be 0"));
    }

    if config.db_timeout_seconds() == 0 {
        return Err(anyhow::anyhow!("Database timeout cannot be 0"));
    }

    if config.signed_url_ttl_secs() < config.fetch_timeout_secs() {
        tracing::warn!(
            signed_url_ttl_secs = config.signed_url_ttl_secs(),
            fetch_timeout_secs = config.fetch_timeout_secs(),
            "Signed URLs may expire before a slow fetch completes"
        );
    }

    Ok(())
}
