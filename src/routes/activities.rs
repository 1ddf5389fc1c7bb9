// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity ingestion and read API for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Activity, ActivityStatus, ActivityType, IngestPayload};
use crate::services::IngestService;
use crate::store::{ActivityFilter, ActivityStore};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const MAX_PER_PAGE: u32 = 100;
const RECENT_ACTIVITIES: usize = 5;

/// Activity routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", post(ingest_activity).get(get_activities))
        .route("/api/activities/{id}", get(get_activity))
        .route("/api/stats", get(get_stats))
}

// ─── Ingestion ───────────────────────────────────────────────

/// Ingest a provider payload. Replays of the same
/// `(user, source, sourceId)` return the existing record with 200.
async fn ingest_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<IngestPayload>,
) -> Result<(StatusCode, Json<Activity>)> {
    let service = IngestService::new(state.store.clone(), state.queue.clone());
    let outcome = service.ingest(&user.user_id, payload).await?;

    let status = if outcome.is_new() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.activity().clone())))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    source: Option<String>,
    #[serde(rename = "type")]
    activity_type: Option<ActivityType>,
    status: Option<ActivityStatus>,
    /// Filter by start date (ISO 8601)
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    20
}

#[derive(Serialize)]
struct ActivitiesResponse {
    activities: Vec<Activity>,
    total: u64,
    page: u32,
    per_page: u32,
    total_pages: u64,
}

/// List the user's activities with filters and pagination.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, MAX_PER_PAGE);

    let filter = ActivityFilter {
        user_id: Some(user.user_id.clone()),
        source: query.source,
        activity_type: query.activity_type,
        status: query.status,
        start_after: query.after,
        start_before: query.before,
        limit: Some(per_page),
        offset: Some((page - 1) * per_page),
    };

    let activities = state.store.list_activities(&filter).await?;
    let total = state.store.count_activities(&filter).await?;

    Ok(Json(ActivitiesResponse {
        activities,
        total,
        page,
        per_page,
        total_pages: total.div_ceil(per_page as u64),
    }))
}

/// Get one activity, scoped to its owner.
async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Activity>> {
    let activity = state
        .store
        .get_activity(id)
        .await?
        .filter(|a| a.user_id == user.user_id)
        .ok_or_else(|| crate::error::AppError::NotFound(format!("Activity {} not found", id)))?;

    Ok(Json(activity))
}

// ─── Stats ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatsQuery {
    #[serde(default)]
    period: StatsPeriod,
}

#[derive(Deserialize, Serialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
enum StatsPeriod {
    Week,
    #[default]
    Month,
    Year,
    All,
}

impl StatsPeriod {
    fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            StatsPeriod::Week => Some(now - Duration::days(7)),
            StatsPeriod::Month => Some(now - Duration::days(30)),
            StatsPeriod::Year => Some(now - Duration::days(365)),
            StatsPeriod::All => None,
        }
    }
}

#[derive(Serialize, Default)]
struct TypeBreakdown {
    count: u32,
    total_distance_meters: f64,
    total_duration_secs: u64,
    total_points: u64,
}

#[derive(Serialize)]
struct StatsResponse {
    period: StatsPeriod,
    total_activities: u32,
    total_distance_meters: f64,
    total_duration_secs: u64,
    total_points: u64,
    by_type: HashMap<String, TypeBreakdown>,
    recent_activities: Vec<Activity>,
}

/// Aggregate stats over the user's verified activities for a period.
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    let filter = ActivityFilter {
        user_id: Some(user.user_id.clone()),
        status: Some(ActivityStatus::Verified),
        start_after: query.period.start(Utc::now()),
        ..ActivityFilter::default()
    };

    let activities = state.store.list_activities(&filter).await?;

    let mut by_type: HashMap<String, TypeBreakdown> = HashMap::new();
    let mut total_distance = 0.0;
    let mut total_duration = 0u64;
    let mut total_points = 0u64;

    for activity in &activities {
        let entry = by_type
            .entry(activity.activity_type.as_str().to_string())
            .or_default();
        entry.count += 1;
        entry.total_distance_meters += activity.distance_meters.unwrap_or(0.0);
        entry.total_duration_secs += activity.duration_secs as u64;
        entry.total_points += activity.points.unwrap_or(0) as u64;

        total_distance += activity.distance_meters.unwrap_or(0.0);
        total_duration += activity.duration_secs as u64;
        total_points += activity.points.unwrap_or(0) as u64;
    }

    let recent_activities = activities.iter().take(RECENT_ACTIVITIES).cloned().collect();

    Ok(Json(StatsResponse {
        period: query.period,
        total_activities: activities.len() as u32,
        total_distance_meters: total_distance,
        total_duration_secs: total_duration,
        total_points,
        by_type,
        recent_activities,
    }))
}
