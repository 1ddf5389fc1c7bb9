// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Queue fed by ingestion, consumed by the fraud check stage.
pub const FRAUD_CHECK_QUEUE: &str = "fraud-check";
/// Queue fed by the fraud check, consumed by the reward scorer.
pub const SCORE_ACTIVITY_QUEUE: &str = "score-activity";
/// Queue fed by the reward scorer, consumed by the league engine.
pub const LEAGUE_SCORE_QUEUE: &str = "league-score";
/// Outbound queue of reward events; consumed by the minting collaborator.
pub const REWARD_MINT_QUEUE: &str = "reward-mint";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Concurrent consumers per pipeline queue
    pub worker_concurrency: usize,
    /// Worker sleep between polls of an empty queue, milliseconds
    pub poll_interval_ms: u64,
    /// Queue lease duration before an unacked delivery returns, seconds
    pub visibility_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            worker_concurrency: env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            poll_interval_ms: env::var("QUEUE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(250),
            visibility_timeout_secs: env::var("QUEUE_VISIBILITY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            worker_concurrency: 2,
            poll_interval_ms: 10,
            visibility_timeout_secs: 30,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.visibility_timeout_secs, 30);
    }
}
