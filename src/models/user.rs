// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sport profile model used to contextualize effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::ActivityType;

/// Self-declared fitness level, a 4-tier scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

impl Default for FitnessLevel {
    fn default() -> Self {
        FitnessLevel::Intermediate
    }
}

/// A user's sport profile.
///
/// The primary sport lowers relative effort for matching activities
/// (specialization makes them easier); unrelated sports raise it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportProfile {
    pub user_id: String,
    #[serde(default)]
    pub fitness_level: FitnessLevel,
    pub primary_sport: Option<ActivityType>,
    #[serde(default)]
    pub secondary_sports: Vec<ActivityType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SportProfile {
    /// Profile used when a user never declared one.
    pub fn default_for(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            fitness_level: FitnessLevel::default(),
            primary_sport: None,
            secondary_sports: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}
