// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward scoring: converts a verified activity into points and emits the
//! reward event for the token-minting consumer.
//!
//! Scoring must happen exactly once per activity. The guard is the
//! `processed` flag behind a single conditional update in the store, not
//! queue deduplication, because delivery is only at-least-once.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config;
use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityStatus, ActivityType, RewardEvent};
use crate::queue::{publish_message, LeagueScoreMessage, Queue};
use crate::store::{ActivityStore, Store};

/// Base points per kilometer, by activity type.
fn points_per_km(activity_type: ActivityType) -> f64 {
    match activity_type {
        ActivityType::Running => 10.0,
        ActivityType::Walking => 5.0,
        ActivityType::Cycling => 3.0,
        ActivityType::Swimming => 15.0,
        ActivityType::FunctionalTraining => 8.0,
        ActivityType::Yoga => 7.0,
        ActivityType::Dance => 8.0,
        ActivityType::Sports => 7.0,
        ActivityType::Other => 5.0,
    }
}

/// Fallback rate for distance-less activities, points per minute.
const POINTS_PER_MINUTE: f64 = 0.5;
/// Calorie bonus divisor: one point per 20 kcal.
const CALORIES_PER_POINT: f64 = 20.0;
/// Hard cap on points from a single activity.
const MAX_POINTS_PER_ACTIVITY: u32 = 200;

/// Compute the reward points for an activity.
///
/// Distance-based when distance is present, per-minute otherwise, plus a
/// calorie bonus, capped at 200. Pure: the fraud evaluator uses the same
/// function to estimate points for its daily cap check.
pub fn calculate_points(activity: &Activity) -> u32 {
    let base = match activity.distance_meters {
        Some(distance) if distance > 0.0 => {
            let km = distance / 1000.0;
            (km * points_per_km(activity.activity_type)).round() as u32
        }
        _ => {
            let minutes = activity.duration_secs as f64 / 60.0;
            (minutes * POINTS_PER_MINUTE).round() as u32
        }
    };

    let calorie_bonus = activity
        .calories
        .map(|c| (c as f64 / CALORIES_PER_POINT).round() as u32)
        .unwrap_or(0);

    (base + calorie_bonus).min(MAX_POINTS_PER_ACTIVITY)
}

/// Queue consumer side of the reward scoring stage.
pub struct RewardService {
    store: Arc<dyn Store>,
    queue: Arc<dyn Queue>,
}

impl RewardService {
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn Queue>) -> Self {
        Self { store, queue }
    }

    /// Process one score-activity message.
    ///
    /// The conditional update on `processed` makes the reward effect
    /// exactly-once: the losing side of a duplicate delivery emits
    /// nothing. League scoring is re-enqueued even on the losing side
    /// (it is idempotent per league), so a crash between the reward
    /// commit and the league enqueue cannot strand the activity.
    pub async fn score_activity(&self, activity_id: Uuid) -> Result<()> {
        let activity = self
            .store
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;

        match activity.status {
            ActivityStatus::Flagged | ActivityStatus::Rejected => {
                tracing::info!(
                    activity_id = %activity_id,
                    status = activity.status.as_str(),
                    "Activity not eligible for reward"
                );
                return Ok(());
            }
            ActivityStatus::Pending => {
                // Pipeline order violated; retry until the fraud verdict lands
                return Err(AppError::BadRequest(format!(
                    "Activity {} has no fraud verdict yet",
                    activity_id
                )));
            }
            ActivityStatus::Verified => {}
        }

        let points = calculate_points(&activity);
        let claimed = self.store.complete_reward(activity_id, points).await?;

        if claimed {
            let event = RewardEvent {
                user_id: activity.user_id.clone(),
                activity_id,
                amount: points,
                reason: format!("Activity: {}", activity.activity_type),
                timestamp: Utc::now(),
            };
            publish_message(self.queue.as_ref(), config::REWARD_MINT_QUEUE, &event).await?;

            tracing::info!(
                activity_id = %activity_id,
                user_id = %activity.user_id,
                points,
                "Reward emitted"
            );
        } else {
            tracing::debug!(
                activity_id = %activity_id,
                "Reward already claimed (idempotent skip)"
            );
        }

        publish_message(
            self.queue.as_ref(),
            config::LEAGUE_SCORE_QUEUE,
            &LeagueScoreMessage {
                activity_id,
                user_id: activity.user_id.clone(),
                league_id: None,
                timestamp: Utc::now(),
            },
        )
        .await
    }
}
