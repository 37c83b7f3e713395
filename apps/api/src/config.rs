use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_UPSTAGE_BASE_URL: &str = "https://api.upstage.ai/v1/information-extraction";

/// Which `ResumeStore` implementation backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to every component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub upstage_api_key: String,
    pub upstage_base_url: String,
    pub extraction_timeout: Duration,
    pub max_upload_bytes: usize,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let store_backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(require("DATABASE_URL")?),
            StoreBackend::Memory => lookup("DATABASE_URL"),
        };

        Ok(Config {
            store_backend,
            database_url,
            upstage_api_key: require("UPSTAGE_API_KEY")?,
            upstage_base_url: lookup("UPSTAGE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_UPSTAGE_BASE_URL.to_string()),
            extraction_timeout: Duration::from_secs(
                lookup("EXTRACTION_TIMEOUT_SECS")
                    .unwrap_or_else(|| "120".to_string())
                    .parse::<u64>()
                    .context("EXTRACTION_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|| "10485760".to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            port: lookup("PORT")
                .unwrap_or_else(|| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
