// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Relative-effort calculation for the training-reward surface.
//!
//! Normalizes an absolute effort (0-100) by the user's sport profile and
//! situational context: how hard was this activity for this user. Feeds
//! the training-reward endpoint only; league scores never use it.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    ActivityEffort, ActivityType, ContextualFactors, EffortMetrics, FitnessLevel, SportProfile,
    Terrain, Weather,
};
use crate::services::reward::calculate_points;
use crate::store::{ActivityStore, ProfileStore, Store};

/// Effort used when the caller reports none.
const DEFAULT_ABSOLUTE_EFFORT: f64 = 70.0;

/// Reward multiplier range the relative effort maps onto.
const EFFORT_MULTIPLIER_MIN: f64 = 0.5;
const EFFORT_MULTIPLIER_MAX: f64 = 2.0;

/// Modifier when the activity matches the user's primary sport:
/// specialization makes it easier, so relative effort drops.
const PRIMARY_SPORT_MODIFIER: f64 = 0.85;
/// Modifier for a sport the user does not train at all.
const UNRELATED_SPORT_MODIFIER: f64 = 1.15;

/// Fitness level modifier: the fitter the user, the lower the relative
/// effort for the same absolute load.
fn fitness_level_modifier(level: FitnessLevel) -> f64 {
    match level {
        FitnessLevel::Beginner => 1.2,
        FitnessLevel::Intermediate => 1.0,
        FitnessLevel::Advanced => 0.85,
        FitnessLevel::Elite => 0.7,
    }
}

/// Modifier by how the activity relates to the user's declared sports.
fn activity_type_modifier(activity_type: ActivityType, profile: &SportProfile) -> f64 {
    match profile.primary_sport {
        Some(primary) if primary == activity_type => PRIMARY_SPORT_MODIFIER,
        Some(_) if profile.secondary_sports.contains(&activity_type) => 1.0,
        Some(_) => UNRELATED_SPORT_MODIFIER,
        None => 1.0,
    }
}

/// Multiplicative modifier from terrain, weather, altitude, sleep, and
/// recovery.
fn context_modifier(factors: &ContextualFactors) -> f64 {
    let mut modifier = 1.0;

    if let Some(terrain) = factors.terrain {
        modifier *= match terrain {
            Terrain::Flat => 1.0,
            Terrain::Hilly => 1.1,
            Terrain::Mixed => 1.05,
            Terrain::Mountainous => 1.2,
        };
    }

    if let Some(weather) = factors.weather {
        modifier *= match weather {
            Weather::Normal => 1.0,
            Weather::Hot => 1.15,
            Weather::Cold => 1.05,
            Weather::Rainy => 1.1,
            Weather::Windy => 1.1,
        };
    }

    // Every 500 m above 1000 m adds 2%
    if let Some(altitude) = factors.altitude {
        if altitude > 1000.0 {
            modifier *= 1.0 + 0.02 * ((altitude - 1000.0) / 500.0).floor();
        }
    }

    // Each missing hour below 7 h of sleep adds 5%
    if let Some(sleep) = factors.sleep {
        if sleep < 7.0 {
            modifier *= 1.0 + 0.05 * (7.0 - sleep);
        }
    }

    // Incomplete recovery adds up to 20%
    if let Some(recovery) = factors.recovery {
        modifier *= 1.0 + 0.2 * (1.0 - recovery / 100.0);
    }

    modifier
}

/// Profile-normalized effort, clamped to 0-100.
pub fn relative_effort(
    absolute_effort: f64,
    activity_type: ActivityType,
    profile: &SportProfile,
    factors: Option<&ContextualFactors>,
) -> f64 {
    let context = factors.map(context_modifier).unwrap_or(1.0);
    let raw = absolute_effort
        * fitness_level_modifier(profile.fitness_level)
        * activity_type_modifier(activity_type, profile)
        * context;
    raw.clamp(0.0, 100.0)
}

/// Map relative effort onto the configured multiplier range.
pub fn effort_multiplier(relative_effort: f64) -> f64 {
    EFFORT_MULTIPLIER_MIN
        + (relative_effort / 100.0) * (EFFORT_MULTIPLIER_MAX - EFFORT_MULTIPLIER_MIN)
}

/// Effort calculation service.
pub struct EffortService {
    store: Arc<dyn Store>,
}

impl EffortService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Compute and persist the effort record for one activity.
    pub async fn calculate(
        &self,
        user_id: &str,
        activity_id: Uuid,
        absolute_effort: Option<f64>,
        factors: Option<ContextualFactors>,
    ) -> Result<ActivityEffort> {
        let activity = self
            .store
            .get_activity(activity_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;

        let profile = self
            .store
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| SportProfile::default_for(user_id));

        let absolute_effort = absolute_effort.unwrap_or(DEFAULT_ABSOLUTE_EFFORT);
        let relative = relative_effort(
            absolute_effort,
            activity.activity_type,
            &profile,
            factors.as_ref(),
        );

        let base_reward = calculate_points(&activity);
        let multiplier = effort_multiplier(relative);
        let calculated_reward = (base_reward as f64 * multiplier).round() as u32;

        let effort = ActivityEffort {
            activity_id,
            user_id: user_id.to_string(),
            effort_metrics: EffortMetrics {
                absolute_effort,
                relative_effort: relative,
                contextual_factors: factors,
            },
            base_reward,
            effort_multiplier: multiplier,
            calculated_reward,
            created_at: Utc::now(),
        };

        self.store.insert_effort(&effort).await?;

        tracing::info!(
            activity_id = %activity_id,
            user_id = %user_id,
            relative_effort = relative,
            calculated_reward,
            "Effort calculated"
        );

        Ok(effort)
    }

    /// Effort history for a user, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<ActivityEffort>, u64)> {
        self.store.list_efforts(user_id, limit, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(level: FitnessLevel, primary: Option<ActivityType>) -> SportProfile {
        let mut profile = SportProfile::default_for("u1");
        profile.fitness_level = level;
        profile.primary_sport = primary;
        profile
    }

    #[test]
    fn undeclared_profile_leaves_effort_unchanged() {
        let relative = relative_effort(
            70.0,
            ActivityType::Running,
            &profile(FitnessLevel::Intermediate, None),
            None,
        );
        assert_eq!(relative, 70.0);
    }

    #[test]
    fn primary_sport_lowers_relative_effort() {
        let relative = relative_effort(
            70.0,
            ActivityType::Running,
            &profile(FitnessLevel::Intermediate, Some(ActivityType::Running)),
            None,
        );
        assert!(relative < 70.0);
    }

    #[test]
    fn unrelated_sport_raises_relative_effort() {
        let relative = relative_effort(
            70.0,
            ActivityType::Swimming,
            &profile(FitnessLevel::Intermediate, Some(ActivityType::Running)),
            None,
        );
        assert!(relative > 70.0);
    }

    #[test]
    fn elite_fitness_lowers_relative_effort() {
        let intermediate = relative_effort(
            70.0,
            ActivityType::Running,
            &profile(FitnessLevel::Intermediate, None),
            None,
        );
        let elite = relative_effort(
            70.0,
            ActivityType::Running,
            &profile(FitnessLevel::Elite, None),
            None,
        );
        assert!(elite < intermediate);
    }

    #[test]
    fn relative_effort_is_clamped_to_hundred() {
        let factors = ContextualFactors {
            terrain: Some(Terrain::Mountainous),
            weather: Some(Weather::Hot),
            sleep: Some(4.0),
            ..ContextualFactors::default()
        };
        let relative = relative_effort(
            95.0,
            ActivityType::Swimming,
            &profile(FitnessLevel::Beginner, Some(ActivityType::Running)),
            Some(&factors),
        );
        assert_eq!(relative, 100.0);
    }

    #[test]
    fn mountainous_terrain_adds_twenty_percent() {
        let factors = ContextualFactors {
            terrain: Some(Terrain::Mountainous),
            ..ContextualFactors::default()
        };
        assert!((context_modifier(&factors) - 1.2).abs() < 1e-9);
    }

    #[test]
    fn altitude_effect_steps_every_five_hundred_meters() {
        let factors = ContextualFactors {
            altitude: Some(2200.0),
            ..ContextualFactors::default()
        };
        // 1200 m above 1000 m -> two full 500 m steps -> +4%
        assert!((context_modifier(&factors) - 1.04).abs() < 1e-9);
    }

    #[test]
    fn short_sleep_adds_five_percent_per_hour() {
        let factors = ContextualFactors {
            sleep: Some(5.0),
            ..ContextualFactors::default()
        };
        assert!((context_modifier(&factors) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn low_recovery_adds_up_to_twenty_percent() {
        let factors = ContextualFactors {
            recovery: Some(0.0),
            ..ContextualFactors::default()
        };
        assert!((context_modifier(&factors) - 1.2).abs() < 1e-9);

        let recovered = ContextualFactors {
            recovery: Some(100.0),
            ..ContextualFactors::default()
        };
        assert!((context_modifier(&recovered) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn effort_multiplier_spans_configured_range() {
        assert!((effort_multiplier(0.0) - EFFORT_MULTIPLIER_MIN).abs() < 1e-9);
        assert!((effort_multiplier(100.0) - EFFORT_MULTIPLIER_MAX).abs() < 1e-9);
        assert!((effort_multiplier(50.0) - 1.25).abs() < 1e-9);
    }
}
