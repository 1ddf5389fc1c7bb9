// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod effort;
pub mod fraud;
pub mod ingest;
pub mod league;
pub mod reward;

pub use effort::EffortService;
pub use fraud::{evaluate, FraudCheck, FraudService, UserContext};
pub use ingest::IngestService;
pub use league::{CreateLeague, LeaderboardEntry, LeagueService};
pub use reward::{calculate_points, RewardService};
