// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod effort;
pub mod league;
pub mod reward;
pub mod user;

pub use activity::{Activity, ActivityStatus, ActivityType, IngestPayload};
pub use effort::{ActivityEffort, ContextualFactors, EffortMetrics, Terrain, Weather};
pub use league::{ContestKind, League, LeagueMember, ScoreEntry, ScoringType};
pub use reward::RewardEvent;
pub use user::{FitnessLevel, SportProfile};
