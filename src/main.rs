// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitPulse API Server
//!
//! Ingests fitness activities from provider integrations, screens them for
//! fraud, converts them into rewards, and maintains league leaderboards.

use fitpulse::{
    config::Config,
    queue::MemoryQueue,
    store::MemoryStore,
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting FitPulse API");

    // Initialize the store and queue backends
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(Duration::from_secs(
        config.visibility_timeout_secs,
    )));
    tracing::info!(
        visibility_timeout_secs = config.visibility_timeout_secs,
        "Queue broker initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        queue,
    });

    // Start the pipeline worker pools
    let workers = fitpulse::workers::spawn_workers(state.clone());
    tracing::info!(
        workers = workers.len(),
        concurrency = config.worker_concurrency,
        "Pipeline workers started"
    );

    // Build router
    let app = fitpulse::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
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
                .add_directive("fitpulse=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
