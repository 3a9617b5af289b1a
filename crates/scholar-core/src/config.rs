//! Configuration module
//!
//! Environment-driven configuration for the document service: HTTP server, database,
//! object storage, URL signing and delivery cache settings.

use std::env;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_SWEEP_SECS, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_SIGNED_URL_TTL_SECS,
};
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_DOCUMENT_SIZE_MB: usize = 50;
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Server-level configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Document service configuration
#[derive(Clone, Debug)]
pub struct DocumentServiceConfig {
    pub base: BaseConfig,
    pub database_url: Option<String>,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, R2, ...)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    /// Externally reachable base URL of this service, used for local signed URLs
    pub public_base_url: String,
    pub url_signing_secret: Option<String>,
    pub signed_url_ttl_secs: u64,
    // Delivery cache
    pub cache_ttl_secs: u64,
    pub cache_sweep_interval_secs: u64,
    pub cache_max_entries: usize,
    pub fetch_timeout_secs: u64,
    // Upload limits
    pub max_document_size_bytes: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<DocumentServiceConfig>);

impl Config {
    fn inner(&self) -> &DocumentServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = DocumentServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn url_signing_secret(&self) -> Option<&str> {
        self.inner().url_signing_secret.as_deref()
    }

    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.inner().signed_url_ttl_secs
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        self.inner().cache_ttl_secs
    }

    pub fn cache_sweep_interval_secs(&self) -> u64 {
        self.inner().cache_sweep_interval_secs
    }

    pub fn cache_max_entries(&self) -> usize {
        self.inner().cache_max_entries
    }

    pub fn fetch_timeout_secs(&self) -> u64 {
        self.inner().fetch_timeout_secs
    }

    pub fn max_document_size_bytes(&self) -> usize {
        self.inner().max_document_size_bytes
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl DocumentServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let base = BaseConfig {
            server_port,
            cors_origins,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let public_base_url = env_opt("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", server_port));

        Ok(DocumentServiceConfig {
            base,
            database_url: env_opt("DATABASE_URL"),
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            public_base_url,
            url_signing_secret: env_opt("URL_SIGNING_SECRET"),
            signed_url_ttl_secs: env_or("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS),
            cache_ttl_secs: env_or("DOCUMENT_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            cache_sweep_interval_secs: env_or(
                "DOCUMENT_CACHE_SWEEP_SECS",
                DEFAULT_CACHE_SWEEP_SECS,
            ),
            cache_max_entries: env_or("DOCUMENT_CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES),
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", FETCH_TIMEOUT_SECS),
            max_document_size_bytes: env_or("MAX_DOCUMENT_SIZE_MB", MAX_DOCUMENT_SIZE_MB)
                * 1024
                * 1024,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when STORAGE_BACKEND=s3"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when STORAGE_BACKEND=s3"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local"
                    ));
                }
                match self.url_signing_secret.as_deref() {
                    Some(secret) if secret.len() >= 32 => {}
                    _ => {
                        return Err(anyhow::anyhow!(
                            "URL_SIGNING_SECRET must be at least 32 characters when STORAGE_BACKEND=local"
                        ))
                    }
                }
            }
        }

        if self.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS cannot be 0"));
        }
        if self.cache_ttl_secs == 0 || self.cache_sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "DOCUMENT_CACHE_TTL_SECS and DOCUMENT_CACHE_SWEEP_SECS must be positive"
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(anyhow::anyhow!("DOCUMENT_CACHE_MAX_ENTRIES cannot be 0"));
        }
        if self.max_document_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_DOCUMENT_SIZE_MB cannot be 0"));
        }

        Ok(())
    }
}
