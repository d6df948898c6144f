//! Capryos HTTP service: public blog pages, newsletter and suggestion forms,
//! the contact relay and the admin console API.

mod admin;
mod auth;
mod config;
mod contact;
mod error;
mod handlers;
mod live;
mod request_context;
mod routes;
mod state;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Default to info-level logs; override via RUST_LOG if needed.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting Capryos backend");
    tracing::info!("Database: {}", config.db_path);
    if !config.admin_enabled() {
        tracing::warn!(
            "CAPRYOS_ADMIN_EMAIL / CAPRYOS_ADMIN_PASSWORD_SHA256 not set, admin login disabled"
        );
    }
    if config.contact_endpoint.is_none() {
        tracing::warn!("CAPRYOS_CONTACT_ENDPOINT not set, contact form will answer 503");
    }

    let addr = config.listen_addr();
    let app_state = state::AppState::open(config)?;
    let app = routes::create_router(app_state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
