//! coupon-hub server entry point.
//!
//! Loads configuration, picks the storage backend, wires the services and
//! serves the REST API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use coupon_hub::api;
use coupon_hub::app_state::AppState;
use coupon_hub::auth::AccessTokens;
use coupon_hub::config::HubConfig;
use coupon_hub::media::DiskUploader;
use coupon_hub::persistence::{CouponStore, MemoryStore, PostgresStore};
use coupon_hub::service::RedemptionTokens;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config =
        HubConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting coupon-hub");

    // Build persistence layer
    let store: Arc<dyn CouponStore> = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("failed to connect to PostgreSQL")?;
        let store = PostgresStore::new(pool);
        store.migrate().await.context("failed to run migrations")?;
        tracing::info!("using PostgreSQL store");
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled, data lives in memory only");
        Arc::new(MemoryStore::new())
    };

    // Build media and service layers
    tokio::fs::create_dir_all(&config.media_dir)
        .await
        .with_context(|| format!("failed to create {}", config.media_dir.display()))?;
    let media = Arc::new(
        DiskUploader::new(config.media_dir.clone(), config.public_base_url.clone())
            .with_max_bytes(config.max_upload_bytes),
    );
    let app_state = AppState::new(
        store,
        media,
        AccessTokens::new(&config.access_token_secret),
        RedemptionTokens::new(
            &config.redemption_token_secret,
            config.redemption_token_ttl_secs,
        ),
        config.public_base_url.clone(),
    );

    // Build router
    let app = api::build_app(
        app_state,
        &config.media_dir,
        Duration::from_secs(config.request_timeout_secs),
        config.max_upload_bytes,
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
