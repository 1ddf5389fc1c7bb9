// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound reward-event contract for the token-minting consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Write-once reward grant emitted after scoring.
///
/// Pushed to the reward-mint queue and consumed at-least-once downstream;
/// the pipeline does not track minting success. Wire format is camelCase
/// like the rest of the queue contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardEvent {
    pub user_id: String,
    pub activity_id: Uuid,
    pub amount: u32,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}
