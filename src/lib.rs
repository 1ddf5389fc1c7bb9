// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FitPulse: activity ingestion, fraud scoring, rewards, and leaderboards
//!
//! This crate is the backend pipeline that turns third-party fitness
//! activities into auditable reward scores and competitive league
//! standings: exactly-once reward effect over at-least-once delivery.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod routes;
pub mod services;
pub mod store;
pub mod workers;

use std::sync::Arc;

use config::Config;
use queue::Queue;
use store::Store;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn Queue>,
}
