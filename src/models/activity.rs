// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity model: one normalized exercise session from any source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Activity types accepted from providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Running,
    Walking,
    Cycling,
    Swimming,
    FunctionalTraining,
    Yoga,
    Dance,
    Sports,
    Other,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Walking => "walking",
            ActivityType::Cycling => "cycling",
            ActivityType::Swimming => "swimming",
            ActivityType::FunctionalTraining => "functional_training",
            ActivityType::Yoga => "yoga",
            ActivityType::Dance => "dance",
            ActivityType::Sports => "sports",
            ActivityType::Other => "other",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an activity.
///
/// Transitions: `pending -> {verified | flagged}` by the fraud check,
/// `flagged -> {verified | rejected}` by an admin. `rejected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Pending,
    Verified,
    Flagged,
    Rejected,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Verified => "verified",
            ActivityStatus::Flagged => "flagged",
            ActivityStatus::Rejected => "rejected",
        }
    }
}

/// Stored activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// System-generated ID (also used as document ID)
    pub id: Uuid,
    /// Owner user ID
    pub user_id: String,
    /// Provider name ("strava", "apple_health", ...)
    pub source: String,
    /// Provider-side record ID; `(user_id, source, source_id)` is the
    /// idempotency anchor for ingestion
    pub source_id: String,
    /// Activity type
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Session start
    pub start_time: DateTime<Utc>,
    /// Session end
    pub end_time: DateTime<Utc>,
    /// Duration in seconds
    pub duration_secs: u32,
    /// Distance in meters, if the provider reported one
    pub distance_meters: Option<f64>,
    /// Calories burned, if reported
    pub calories: Option<u32>,
    /// Elevation gain in meters, if reported
    pub elevation_gain: Option<f64>,
    /// Lifecycle status
    pub status: ActivityStatus,
    /// Whether the reward has been emitted (one-way false -> true)
    pub processed: bool,
    /// Additive heuristic risk score from the fraud check
    pub fraud_score: u32,
    /// Reasons contributing to the fraud score, in check order
    pub fraud_reasons: Vec<String>,
    /// Reward points computed by the scorer
    pub points: Option<u32>,
    /// Admin/moderation trail (set on flag/approve/reject)
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    /// When this activity was ingested
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Average speed in km/h, when both distance and duration are known.
    pub fn speed_kph(&self) -> Option<f64> {
        let distance = self.distance_meters?;
        if self.duration_secs == 0 {
            return None;
        }
        Some(distance / self.duration_secs as f64 * 3.6)
    }
}

/// Inbound payload contract from the provider-normalization collaborator.
///
/// All timestamps are ISO 8601; `duration` is seconds. The wire format is
/// camelCase (`sourceId`, `startTime`, ...), matching what providers send.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestPayload {
    #[validate(length(min = 1, max = 64))]
    pub source: String,
    #[validate(length(min = 1, max = 128))]
    pub source_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Duration in seconds; must match `end_time - start_time` within tolerance
    #[validate(range(min = 1))]
    pub duration: u32,
    /// Distance in meters
    #[validate(range(min = 0.0))]
    pub distance: Option<f64>,
    pub calories: Option<u32>,
    pub elevation_gain: Option<f64>,
}
