// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Abstract at-least-once message queue.
//!
//! The broker behind this interface (a durable log, Redis lists, the
//! in-memory channel used by tests and the binary) may deliver any message
//! more than once; every consumer must be idempotent. A received delivery
//! is leased for a visibility timeout: unacked deliveries return to the
//! queue, so a worker crash mid-processing loses nothing.

pub mod memory;

pub use memory::MemoryQueue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// One leased message.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Lease handle for ack/nack
    pub receipt: u64,
    /// Delivery attempt, starting at 1
    pub attempt: u32,
    pub payload: serde_json::Value,
}

impl Delivery {
    /// Decode the payload into a typed message.
    pub fn message<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| AppError::BadRequest(format!("Malformed queue message: {}", e)))
    }
}

/// At-least-once broker interface.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Append a message to the named queue.
    async fn publish(&self, queue: &str, payload: serde_json::Value) -> Result<()>;

    /// Lease the next available message, or None if the queue is empty.
    /// Expired leases are redelivered (with `attempt` incremented) before
    /// fresh messages.
    async fn receive(&self, queue: &str) -> Result<Option<Delivery>>;

    /// Settle a delivery successfully; the message will not be seen again.
    async fn ack(&self, queue: &str, receipt: u64) -> Result<()>;

    /// Return a delivery to the queue for immediate redelivery.
    async fn nack(&self, queue: &str, receipt: u64) -> Result<()>;
}

/// Serialize and publish a typed message.
pub async fn publish_message<T: Serialize>(
    queue: &dyn Queue,
    name: &str,
    message: &T,
) -> Result<()> {
    let payload = serde_json::to_value(message)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Queue message encoding: {}", e)))?;
    queue.publish(name, payload).await
}

// ─── Pipeline message payloads ──────────────────────────────────
//
// Wire format is camelCase JSON: {activityId, userId, timestamp}, with
// leagueId on league-scoring messages.

/// Payload of the fraud-check stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudCheckMessage {
    pub activity_id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Payload of the reward-scoring stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreActivityMessage {
    pub activity_id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Payload of the league-scoring stage.
///
/// Without `league_id` the engine applies the activity to every league
/// the user belongs to; with it, to that league only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueScoreMessage {
    pub activity_id: Uuid,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}
