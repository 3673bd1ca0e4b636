//! Skin disease detection web app.
//!
//! Usage: `skin_detect [config.toml]`. Without an argument `config.toml` in the
//! working directory is used when present, built-in defaults otherwise.
use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use skin_detect::{
    AppConfig, AppState, DEFAULT_CONFIG_FILE, create_router, init_logger, parse_toml,
};

fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => parse_toml(&path).with_context(|| format!("loading {}", path.display())),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                parse_toml(&path).with_context(|| format!("loading {}", path.display()))
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_logger(&config.logging);

    let state = Arc::new(AppState::from_config(&config)?);
    if !state.model.is_loaded() {
        tracing::warn!("Starting without a model; predictions will be refused");
    }

    let body_limit = config.server.body_limit_mb * 1024 * 1024;
    let app = create_router(state, body_limit);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
