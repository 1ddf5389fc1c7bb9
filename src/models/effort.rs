// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Relative-effort records for the training-reward surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terrain encountered during an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Flat,
    Hilly,
    Mixed,
    Mountainous,
}

/// Weather conditions during an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Normal,
    Hot,
    Cold,
    Rainy,
    Windy,
}

/// Situational factors that make the same absolute effort harder or easier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextualFactors {
    pub terrain: Option<Terrain>,
    pub weather: Option<Weather>,
    /// Altitude in meters
    pub altitude: Option<f64>,
    /// Hours slept the previous night
    pub sleep: Option<f64>,
    /// Recovery score 0-100, where 100 is fully recovered
    pub recovery: Option<f64>,
}

/// Effort inputs and the normalized result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortMetrics {
    /// Raw effort 0-100 as reported/perceived
    pub absolute_effort: f64,
    /// Profile-normalized effort 0-100: how hard this was for this user
    pub relative_effort: f64,
    pub contextual_factors: Option<ContextualFactors>,
}

/// A persisted effort calculation for one activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEffort {
    pub activity_id: Uuid,
    pub user_id: String,
    pub effort_metrics: EffortMetrics,
    /// Flat per-activity-type base before the effort multiplier
    pub base_reward: u32,
    pub effort_multiplier: f64,
    pub calculated_reward: u32,
    pub created_at: DateTime<Utc>,
}
