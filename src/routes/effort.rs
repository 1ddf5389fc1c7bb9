// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training effort routes: relative-effort calculation, history, and the
//! sport profile it is contextualized by.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityEffort, ActivityType, ContextualFactors, FitnessLevel, SportProfile};
use crate::services::EffortService;
use crate::store::ProfileStore;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const MAX_HISTORY_PAGE: u32 = 100;

/// Effort routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/effort", post(calculate_effort))
        .route("/api/effort/history", get(effort_history))
        .route("/api/profile", get(get_profile).put(put_profile))
}

#[derive(Deserialize)]
struct EffortRequest {
    activity_id: Uuid,
    /// Raw effort 0-100; defaults when absent
    absolute_effort: Option<f64>,
    contextual_factors: Option<ContextualFactors>,
}

/// Compute the relative effort and training reward for one activity.
async fn calculate_effort(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<EffortRequest>,
) -> Result<Json<ActivityEffort>> {
    let effort = EffortService::new(state.store.clone())
        .calculate(
            &user.user_id,
            request.activity_id,
            request.absolute_effort,
            request.contextual_factors,
        )
        .await?;
    Ok(Json(effort))
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Serialize)]
struct HistoryResponse {
    efforts: Vec<ActivityEffort>,
    total: u64,
}

/// The user's effort history, newest first.
async fn effort_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = query.limit.clamp(1, MAX_HISTORY_PAGE);
    let (efforts, total) = EffortService::new(state.store.clone())
        .history(&user.user_id, limit, query.offset)
        .await?;
    Ok(Json(HistoryResponse { efforts, total }))
}

/// Current sport profile; defaults to intermediate when never declared.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SportProfile>> {
    let profile = state
        .store
        .get_profile(&user.user_id)
        .await?
        .unwrap_or_else(|| SportProfile::default_for(&user.user_id));
    Ok(Json(profile))
}

#[derive(Deserialize)]
struct ProfileRequest {
    fitness_level: FitnessLevel,
    primary_sport: Option<ActivityType>,
    #[serde(default)]
    secondary_sports: Vec<ActivityType>,
}

/// Declare or update the sport profile.
async fn put_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<SportProfile>> {
    let now = Utc::now();
    let created_at = state
        .store
        .get_profile(&user.user_id)
        .await?
        .map(|p| p.created_at)
        .unwrap_or(now);

    let profile = SportProfile {
        user_id: user.user_id.clone(),
        fitness_level: request.fitness_level,
        primary_sport: request.primary_sport,
        secondary_sports: request.secondary_sports,
        created_at,
        updated_at: now,
    };

    state.store.upsert_profile(&profile).await?;
    Ok(Json(profile))
}
