//! installer - install script server

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use installer_server::{Config, app};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // --log-level wins over RUST_LOG
    let filter = match config.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level).context("Invalid log level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !config.default_user.is_empty() {
        info!("default user is '{}'", config.default_user);
    }
    if let Some(provider) = &config.provider {
        info!("serving every request from {provider}");
    }

    let app = app(&config)?;
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on {addr}...");

    axum::serve(listener, app).await.context("Server error")?;
    info!("exiting");
    Ok(())
}
