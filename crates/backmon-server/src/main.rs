use anyhow::Result;
use backmon_server::config::ServerConfig;
use backmon_server::state::AppState;
use backmon_server::{app, seed};
use backmon_storage::store::DbStorage;
use backmon_storage::Storage;
use chrono::Utc;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("backmon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/server.toml");

    let config = if Path::new(config_path).exists() {
        ServerConfig::load(config_path)?
    } else {
        tracing::info!(path = %config_path, "config file not found, using defaults");
        ServerConfig::default()
    };

    if config.database.url.is_none() {
        std::fs::create_dir_all(&config.database.data_dir)?;
    }

    let storage: Arc<dyn Storage> =
        Arc::new(DbStorage::new(&config.database.connection_url()).await?);
    seed::ensure_admin_user(storage.as_ref()).await?;

    let http_port = config.http_port;
    let state = AppState {
        storage,
        config: Arc::new(config),
        start_time: Utc::now(),
    };

    let app = app::build_http_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
