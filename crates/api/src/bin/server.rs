//! AI Agent Collaboration Bus binary entry point.
//!
//! Loads configuration, wires up the bus, and serves the HTTP/WebSocket
//! surface until interrupted.

use std::net::SocketAddr;

use ai_bus_api::BusServer;
use ai_bus_common::BusConfig;
use anyhow::{Context, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config_path = std::env::var("BUS_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = match BusConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %config_path, error = %err, "falling back to default configuration");
            BusConfig::default()
        }
    };

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

    let mut server = BusServer::new(config, &database_url, &jwt_secret).await?;
    server.start().await?;

    let addr: SocketAddr = format!("{}:{}", server.config().http.host, server.config().http.port).parse().context("invalid host/port configuration")?;
    let listener = tokio::net::TcpListener::bind(addr).await.context("failed to bind HTTP listener")?;
    info!(%addr, "listening");

    axum::serve(listener, server.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    server.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
