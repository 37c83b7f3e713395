mod config;
mod db;
mod errors;
mod extraction;
mod models;
mod resumes;
mod routes;
mod state;
mod uploads;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::db::create_pool;
use crate::extraction::UpstageExtractor;
use crate::resumes::memory_store::MemoryResumeStore;
use crate::resumes::store::{PgResumeStore, ResumeStore};
use crate::routes::build_router;
use crate::state::AppState;
use crate::uploads::S3Archive;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the resume store
    let store: Arc<dyn ResumeStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            Arc::new(PgResumeStore::new(create_pool(database_url).await?))
        }
        StoreBackend::Memory => {
            info!("Using in-memory resume store; records are lost on restart");
            Arc::new(MemoryResumeStore::new())
        }
    };

    // Initialize S3 / MinIO
    let archive = S3Archive::new(build_s3_client(&config).await, config.s3_bucket.clone());
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize extraction client
    let extractor = UpstageExtractor::new(
        config.upstage_api_key.clone(),
        config.upstage_base_url.clone(),
        config.extraction_timeout,
    )?;
    info!(
        "Extraction client initialized (model: {}, timeout: {}s)",
        extraction::schema::EXTRACTION_MODEL,
        config.extraction_timeout.as_secs()
    );

    // Build app state
    let state = AppState {
        store,
        extractor: Arc::new(extractor),
        archive: Arc::new(archive),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
