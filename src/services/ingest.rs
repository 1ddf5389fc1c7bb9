// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity normalizer: turns a provider payload into a pending Activity.
//!
//! Ingestion is idempotent on `(user, source, source_id)`: replays return
//! the existing record and enqueue nothing.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config;
use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityStatus, IngestPayload};
use crate::queue::{publish_message, FraudCheckMessage, Queue};
use crate::store::{ActivityStore, IngestOutcome, Store};

/// Allowed drift between the reported duration and the start/end window.
const DURATION_TOLERANCE_SECS: i64 = 60;

/// Ingestion service.
pub struct IngestService {
    store: Arc<dyn Store>,
    queue: Arc<dyn Queue>,
}

impl IngestService {
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn Queue>) -> Self {
        Self { store, queue }
    }

    /// Ingest one provider payload for a user.
    ///
    /// Returns the stored activity and whether it is new. Validation
    /// failures are surfaced synchronously and never persisted.
    pub async fn ingest(&self, user_id: &str, payload: IngestPayload) -> Result<IngestOutcome> {
        validate_payload(&payload)?;

        let now = Utc::now();
        let activity = Activity {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            source: payload.source,
            source_id: payload.source_id,
            activity_type: payload.activity_type,
            start_time: payload.start_time,
            end_time: payload.end_time,
            duration_secs: payload.duration,
            distance_meters: payload.distance,
            calories: payload.calories,
            elevation_gain: payload.elevation_gain,
            status: ActivityStatus::Pending,
            processed: false,
            fraud_score: 0,
            fraud_reasons: vec![],
            points: None,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: now,
            updated_at: now,
        };

        let outcome = self.store.insert_activity_if_absent(activity).await?;

        match &outcome {
            IngestOutcome::Created(activity) => {
                publish_message(
                    self.queue.as_ref(),
                    config::FRAUD_CHECK_QUEUE,
                    &FraudCheckMessage {
                        activity_id: activity.id,
                        user_id: activity.user_id.clone(),
                        timestamp: now,
                    },
                )
                .await?;

                tracing::info!(
                    activity_id = %activity.id,
                    user_id = %activity.user_id,
                    source = %activity.source,
                    activity_type = %activity.activity_type,
                    "Activity ingested"
                );
            }
            IngestOutcome::Duplicate(activity) => {
                tracing::debug!(
                    activity_id = %activity.id,
                    user_id = %activity.user_id,
                    source = %activity.source,
                    source_id = %activity.source_id,
                    "Duplicate ingest (idempotent skip)"
                );
            }
        }

        Ok(outcome)
    }
}

/// Structural and semantic payload validation.
fn validate_payload(payload: &IngestPayload) -> Result<()> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidPayload(e.to_string()))?;

    if payload.end_time <= payload.start_time {
        return Err(AppError::InvalidPayload(
            "end_time must be after start_time".to_string(),
        ));
    }

    let window_secs = (payload.end_time - payload.start_time).num_seconds();
    if (window_secs - payload.duration as i64).abs() > DURATION_TOLERANCE_SECS {
        return Err(AppError::InvalidPayload(format!(
            "duration {}s does not match start/end window {}s",
            payload.duration, window_secs
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;
    use chrono::{Duration, Utc};

    fn payload() -> IngestPayload {
        let start = Utc::now() - Duration::hours(2);
        IngestPayload {
            source: "strava".to_string(),
            source_id: "ext-1".to_string(),
            activity_type: ActivityType::Running,
            start_time: start,
            end_time: start + Duration::seconds(3600),
            duration: 3600,
            distance: Some(10_000.0),
            calories: None,
            elevation_gain: None,
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(validate_payload(&payload()).is_ok());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut p = payload();
        p.end_time = p.start_time - Duration::seconds(10);
        assert!(matches!(
            validate_payload(&p),
            Err(AppError::InvalidPayload(_))
        ));
    }

    #[test]
    fn duration_mismatch_is_rejected() {
        let mut p = payload();
        p.duration = 600;
        assert!(matches!(
            validate_payload(&p),
            Err(AppError::InvalidPayload(_))
        ));
    }

    #[test]
    fn duration_within_tolerance_passes() {
        let mut p = payload();
        p.duration = 3630;
        assert!(validate_payload(&p).is_ok());
    }

    #[test]
    fn empty_source_is_rejected() {
        let mut p = payload();
        p.source = String::new();
        assert!(matches!(
            validate_payload(&p),
            Err(AppError::InvalidPayload(_))
        ));
    }
}
