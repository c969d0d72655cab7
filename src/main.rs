// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat Sessions API Server
//!
//! Serves account registration, login and token refresh for the chat
//! backend.

use chat_sessions::{config::Config, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        access_token_validity_secs = config.access_token_validity.num_seconds(),
        refresh_token_validity_secs = config.refresh_token_validity.num_seconds(),
        "Starting Chat Sessions API"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    // Expired refresh wrappers are removed by the store's own sweep
    spawn_refresh_token_sweeper(state.clone(), config.refresh_sweep_interval_secs);

    // Build router
    let app = chat_sessions::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_refresh_token_sweeper(state: Arc<AppState>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(e) = state.sessions.purge_expired_refresh_tokens() {
                tracing::warn!(error = %e, "Refresh token sweep failed");
            }
        }
    });
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_sessions=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
