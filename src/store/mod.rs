// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: capability traits over the activity and league stores.
//!
//! Every pipeline stage commits its effect through a conditional update on
//! the entity's current state (`status`, `processed`), so duplicate queue
//! deliveries are no-ops. Backends must implement these conditions
//! atomically; the in-memory backend is the reference implementation.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Activity, ActivityEffort, ActivityStatus, ActivityType, League, SportProfile,
};

/// Outcome of an idempotent activity insert.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// First time this `(user, source, source_id)` was seen.
    Created(Activity),
    /// Already ingested; carries the existing record, unchanged.
    Duplicate(Activity),
}

impl IngestOutcome {
    pub fn activity(&self) -> &Activity {
        match self {
            IngestOutcome::Created(a) | IngestOutcome::Duplicate(a) => a,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, IngestOutcome::Created(_))
    }
}

/// Outcome of applying one activity's contribution to one league.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Score mutated, membership re-ranked.
    Applied { contribution: f64, new_score: f64, new_rank: u32 },
    /// This `(activity, league)` pair was already applied; no-op.
    AlreadyScored,
    /// The user has no active membership in the league.
    NotMember,
}

/// Query filter for activity listings.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_id: Option<String>,
    pub source: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub status: Option<ActivityStatus>,
    /// Inclusive lower bound on `start_time`
    pub start_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `start_time`
    pub start_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Activity persistence operations.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Insert unless `(user_id, source, source_id)` already exists.
    async fn insert_activity_if_absent(&self, activity: Activity) -> Result<IngestOutcome>;

    async fn get_activity(&self, id: Uuid) -> Result<Option<Activity>>;

    /// Activities matching the filter, newest `start_time` first.
    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>>;

    /// Total matches for the filter, ignoring its pagination fields.
    async fn count_activities(&self, filter: &ActivityFilter) -> Result<u64>;

    /// Commit the fraud verdict: set status, score, and reasons iff the
    /// activity is still `pending`. Returns false if the precondition
    /// failed (duplicate delivery or concurrent transition).
    async fn record_fraud_outcome(
        &self,
        id: Uuid,
        to: ActivityStatus,
        fraud_score: u32,
        fraud_reasons: &[String],
    ) -> Result<bool>;

    /// Conditionally transition `status` from one of `from` to `to`,
    /// recording the moderation trail. Returns false if the activity was
    /// not in an accepted state.
    async fn transition_status(
        &self,
        id: Uuid,
        from: &[ActivityStatus],
        to: ActivityStatus,
        reviewed_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool>;

    /// The exactly-once reward guard: set `points` and `processed = true`
    /// iff `processed` is still false and the activity is `verified`.
    /// Returns false when another delivery already claimed the reward.
    async fn complete_reward(&self, id: Uuid, points: u32) -> Result<bool>;

    // ─── Fraud-context queries ───────────────────────────────────

    /// Other activities of the user overlapping `[start, end]`.
    async fn count_overlapping(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Uuid,
    ) -> Result<u64>;

    /// Other activities of the user on the same UTC calendar day as `at`.
    async fn count_same_day(&self, user_id: &str, at: DateTime<Utc>, exclude: Uuid) -> Result<u64>;

    /// Points already awarded to the user on the same UTC calendar day.
    async fn sum_points_same_day(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
        exclude: Uuid,
    ) -> Result<u64>;

    /// Lifetime count of the user's flagged activities.
    async fn count_flagged(&self, user_id: &str) -> Result<u64>;
}

/// League/competition persistence operations.
///
/// Implementations must serialize all mutations of one league (the
/// single-writer-per-league discipline), so score mutation, resort, and
/// rank reassignment are observed as one atomic unit.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    async fn insert_league(&self, league: League) -> Result<League>;

    async fn get_league(&self, id: Uuid) -> Result<Option<League>>;

    /// Leagues where the user holds an active membership.
    async fn leagues_for_user(&self, user_id: &str) -> Result<Vec<League>>;

    /// Join a league, enforcing the window, duplicate-membership, access
    /// code, and participant-cap rules, then re-rank.
    async fn join_league(
        &self,
        league_id: Uuid,
        user_id: &str,
        access_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<League>;

    /// Soft-remove a member (forbidden for the creator), then re-rank.
    async fn leave_league(&self, league_id: Uuid, user_id: &str, now: DateTime<Utc>) -> Result<()>;

    /// Apply one activity's contribution to one member: idempotent per
    /// `(activity, league)`, appends history, resorts, reassigns ranks.
    async fn apply_contribution(
        &self,
        league_id: Uuid,
        user_id: &str,
        activity_id: Uuid,
        contribution: f64,
        date: DateTime<Utc>,
    ) -> Result<ApplyOutcome>;
}

/// Sport profile and effort-record persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<SportProfile>>;

    async fn upsert_profile(&self, profile: &SportProfile) -> Result<()>;

    async fn insert_effort(&self, effort: &ActivityEffort) -> Result<()>;

    /// Effort records for a user, newest first, with the total count.
    async fn list_efforts(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<ActivityEffort>, u64)>;
}

/// The full storage capability handed to services and workers.
pub trait Store: ActivityStore + LeagueStore + ProfileStore {}

impl<T: ActivityStore + LeagueStore + ProfileStore> Store for T {}
