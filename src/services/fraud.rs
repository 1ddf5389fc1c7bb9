// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fraud risk evaluation.
//!
//! The evaluator itself is a pure function of the activity and a snapshot
//! of the user's recent history: identical inputs always produce the
//! identical score and reasons, which is what makes verdicts auditable.
//! The surrounding service gathers the snapshot, commits the verdict with
//! a conditional update, and enqueues the next stage.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config;
use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityStatus, ActivityType};
use crate::queue::{publish_message, Queue, ScoreActivityMessage};
use crate::services::reward::calculate_points;
use crate::store::{ActivityStore, Store};

/// Score at or above which an activity is flagged.
const SUSPICIOUS_SCORE: u32 = 70;
/// Reason count at or above which an activity is flagged.
const SUSPICIOUS_REASONS: usize = 3;

/// Max plausible average speed per activity type, km/h.
fn speed_limit_kph(activity_type: ActivityType) -> f64 {
    match activity_type {
        ActivityType::Running => 30.0,
        ActivityType::Walking => 10.0,
        ActivityType::Cycling => 80.0,
        ActivityType::Swimming => 8.0,
        _ => 50.0,
    }
}

/// Max plausible distance per activity type, meters.
fn distance_limit_meters(activity_type: ActivityType) -> f64 {
    match activity_type {
        ActivityType::Running => 100_000.0,
        ActivityType::Walking => 50_000.0,
        ActivityType::Cycling => 300_000.0,
        ActivityType::Swimming => 20_000.0,
        _ => 150_000.0,
    }
}

/// Sources whose records skip the untrusted-source penalty.
const TRUSTED_SOURCES: [&str; 4] = ["strava", "apple_health", "google_fit", "fitbit"];

/// Max session length before the excessive-duration penalty, seconds.
const MAX_DURATION_SECS: u32 = 8 * 60 * 60;
/// Same-day activity count at which the daily cap penalty starts.
const DAILY_ACTIVITY_CAP: u64 = 10;
/// Same-day points above which the daily points penalty applies.
const DAILY_POINTS_CAP: u64 = 500;
/// Penalty per historically flagged activity, and its ceiling.
const FRAUD_HISTORY_STEP: u32 = 5;
const FRAUD_HISTORY_MAX: u32 = 30;

/// Snapshot of the user's history the evaluator needs.
///
/// All counts exclude the activity under evaluation.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    /// Activities overlapping the evaluated activity's time window
    pub overlapping_count: u64,
    /// Activities recorded on the same calendar day
    pub same_day_count: u64,
    /// Points already awarded on the same calendar day
    pub same_day_points: u64,
    /// Lifetime count of the user's flagged activities
    pub flagged_count: u64,
}

/// Result of a fraud evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudCheck {
    pub score: u32,
    pub reasons: Vec<String>,
}

impl FraudCheck {
    /// The verdict: flag at 70+ points or 3+ independent reasons.
    pub fn is_suspicious(&self) -> bool {
        self.score >= SUSPICIOUS_SCORE || self.reasons.len() >= SUSPICIOUS_REASONS
    }
}

/// Evaluate an activity against the additive risk heuristics.
///
/// Checks are independent and order-insensitive; the reasons list keeps
/// check order only for readability.
pub fn evaluate(activity: &Activity, context: &UserContext) -> FraudCheck {
    let mut score = 0u32;
    let mut reasons = Vec::new();

    if let Some(speed_kph) = activity.speed_kph() {
        let limit = speed_limit_kph(activity.activity_type);
        if speed_kph > limit {
            reasons.push(format!("Implausible speed: {:.2} km/h", speed_kph));
            score += 50;
        }
    }

    if activity.duration_secs > MAX_DURATION_SECS {
        reasons.push(format!(
            "Excessive duration: {:.2} hours",
            activity.duration_secs as f64 / 3600.0
        ));
        score += 30;
    }

    if let Some(distance) = activity.distance_meters {
        if distance > distance_limit_meters(activity.activity_type) {
            reasons.push(format!("Excessive distance: {:.2} km", distance / 1000.0));
            score += 40;
        }
    }

    if context.overlapping_count > 0 {
        reasons.push(format!(
            "Overlaps {} other activities",
            context.overlapping_count
        ));
        score += 60;
    }

    if context.same_day_count >= DAILY_ACTIVITY_CAP {
        reasons.push(format!(
            "Daily activity limit exceeded: {} activities",
            context.same_day_count + 1
        ));
        score += 20;
    }

    let estimated_points = calculate_points(activity) as u64;
    if context.same_day_points + estimated_points > DAILY_POINTS_CAP {
        reasons.push(format!(
            "Daily points limit exceeded: {} points",
            context.same_day_points + estimated_points
        ));
        score += 30;
    }

    if !TRUSTED_SOURCES.contains(&activity.source.as_str()) {
        reasons.push(format!("Untrusted source: {}", activity.source));
        score += 10;
    }

    if context.flagged_count > 0 {
        reasons.push(format!(
            "History of flagged activities: {} occurrences",
            context.flagged_count
        ));
        score += (context.flagged_count as u32 * FRAUD_HISTORY_STEP).min(FRAUD_HISTORY_MAX);
    }

    FraudCheck { score, reasons }
}

/// Queue consumer side of the fraud check stage.
pub struct FraudService {
    store: Arc<dyn Store>,
    queue: Arc<dyn Queue>,
}

impl FraudService {
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn Queue>) -> Self {
        Self { store, queue }
    }

    /// Build the evaluator's history snapshot from the store.
    pub async fn build_context(&self, activity: &Activity) -> Result<UserContext> {
        let user_id = &activity.user_id;
        Ok(UserContext {
            overlapping_count: self
                .store
                .count_overlapping(user_id, activity.start_time, activity.end_time, activity.id)
                .await?,
            same_day_count: self
                .store
                .count_same_day(user_id, activity.start_time, activity.id)
                .await?,
            same_day_points: self
                .store
                .sum_points_same_day(user_id, activity.start_time, activity.id)
                .await?,
            flagged_count: self.store.count_flagged(user_id).await?,
        })
    }

    /// Process one fraud-check message.
    ///
    /// Commits `pending -> {verified | flagged}` with a conditional update,
    /// then enqueues scoring for verified activities. Safe under duplicate
    /// delivery: a lost transition is a no-op, and a verified activity is
    /// re-enqueued so a crash between commit and enqueue cannot stall it.
    pub async fn check_activity(&self, activity_id: Uuid) -> Result<()> {
        let activity = self
            .store
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;

        if activity.status != ActivityStatus::Pending {
            tracing::debug!(
                activity_id = %activity_id,
                status = activity.status.as_str(),
                "Fraud check already settled (idempotent skip)"
            );
            if activity.status == ActivityStatus::Verified && !activity.processed {
                self.enqueue_scoring(&activity).await?;
            }
            return Ok(());
        }

        let context = self.build_context(&activity).await?;
        let check = evaluate(&activity, &context);

        let status = if check.is_suspicious() {
            ActivityStatus::Flagged
        } else {
            ActivityStatus::Verified
        };

        let committed = self
            .store
            .record_fraud_outcome(activity_id, status, check.score, &check.reasons)
            .await?;

        if !committed {
            tracing::debug!(
                activity_id = %activity_id,
                "Fraud verdict lost the race (idempotent skip)"
            );
            return Ok(());
        }

        if status == ActivityStatus::Flagged {
            tracing::warn!(
                activity_id = %activity_id,
                user_id = %activity.user_id,
                fraud_score = check.score,
                reasons = ?check.reasons,
                "Activity flagged for review"
            );
            return Ok(());
        }

        tracing::info!(
            activity_id = %activity_id,
            user_id = %activity.user_id,
            fraud_score = check.score,
            "Activity verified"
        );
        self.enqueue_scoring(&activity).await
    }

    async fn enqueue_scoring(&self, activity: &Activity) -> Result<()> {
        publish_message(
            self.queue.as_ref(),
            config::SCORE_ACTIVITY_QUEUE,
            &ScoreActivityMessage {
                activity_id: activity.id,
                user_id: activity.user_id.clone(),
                timestamp: Utc::now(),
            },
        )
        .await
    }

    // ─── Moderation operations ───────────────────────────────────

    /// Flag an activity for review. Allowed from `pending` or `verified`;
    /// `system` is recorded when no admin is given.
    pub async fn flag_activity(
        &self,
        activity_id: Uuid,
        reason: &str,
        admin_id: Option<&str>,
    ) -> Result<Activity> {
        let moved = self
            .store
            .transition_status(
                activity_id,
                &[ActivityStatus::Pending, ActivityStatus::Verified],
                ActivityStatus::Flagged,
                Some(admin_id.unwrap_or("system")),
                Some(reason),
            )
            .await?;

        if !moved {
            return Err(AppError::BadRequest(format!(
                "Activity {} cannot be flagged in its current state",
                activity_id
            )));
        }

        tracing::warn!(
            activity_id = %activity_id,
            admin_id = admin_id.unwrap_or("system"),
            reason,
            "Activity flagged"
        );
        self.get_required(activity_id).await
    }

    /// Approve a flagged activity: it becomes `verified` and re-enters the
    /// pipeline at the reward scoring stage.
    pub async fn approve_activity(
        &self,
        activity_id: Uuid,
        admin_id: &str,
        notes: Option<&str>,
    ) -> Result<Activity> {
        let moved = self
            .store
            .transition_status(
                activity_id,
                &[ActivityStatus::Flagged],
                ActivityStatus::Verified,
                Some(admin_id),
                notes,
            )
            .await?;

        if !moved {
            return Err(AppError::BadRequest(format!(
                "Activity {} is not flagged",
                activity_id
            )));
        }

        let activity = self.get_required(activity_id).await?;
        self.enqueue_scoring(&activity).await?;

        tracing::info!(
            activity_id = %activity_id,
            admin_id = %admin_id,
            "Activity approved and re-queued for scoring"
        );
        Ok(activity)
    }

    /// Reject a flagged activity: terminal, no reward, no league score.
    pub async fn reject_activity(
        &self,
        activity_id: Uuid,
        admin_id: &str,
        reason: &str,
    ) -> Result<Activity> {
        let moved = self
            .store
            .transition_status(
                activity_id,
                &[ActivityStatus::Flagged],
                ActivityStatus::Rejected,
                Some(admin_id),
                Some(reason),
            )
            .await?;

        if !moved {
            return Err(AppError::BadRequest(format!(
                "Activity {} is not flagged",
                activity_id
            )));
        }

        tracing::info!(
            activity_id = %activity_id,
            admin_id = %admin_id,
            reason,
            "Activity rejected"
        );
        self.get_required(activity_id).await
    }

    async fn get_required(&self, activity_id: Uuid) -> Result<Activity> {
        self.store
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))
    }
}
