mod cache;
mod config;
mod metrics;
mod retry;
mod routes;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = config::AppConfig::load().context("Failed to load configuration")?;
    tracing::info!(
        mode = ?config.mode,
        model = %config.llm.model,
        id_namespace = %config.resolution.id_namespace,
        "Configuration loaded"
    );

    let bind_addr = config.server.bind_addr.clone();
    let state = Arc::new(routes::AppState::new(config));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// `RUST_LOG` filter, JSON output when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
