// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Moderation routes, consumed by the external review UI.
//!
//! All endpoints require an admin JWT; `require_admin` is layered on top
//! of `require_auth` in the router.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Activity;
use crate::services::FraudService;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Admin routes (require admin privileges).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/activities/{id}/approve", post(approve_activity))
        .route("/api/admin/activities/{id}/reject", post(reject_activity))
        .route("/api/admin/activities/{id}/flag", post(flag_activity))
}

fn fraud_service(state: &AppState) -> FraudService {
    FraudService::new(state.store.clone(), state.queue.clone())
}

#[derive(Deserialize, Default)]
struct ApproveRequest {
    notes: Option<String>,
}

/// Approve a flagged activity; it re-enters the pipeline at scoring.
async fn approve_activity(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    request: Option<Json<ApproveRequest>>,
) -> Result<Json<Activity>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let activity = fraud_service(&state)
        .approve_activity(id, &admin.user_id, request.notes.as_deref())
        .await?;
    Ok(Json(activity))
}

#[derive(Deserialize)]
struct RejectRequest {
    reason: String,
}

/// Reject a flagged activity; terminal, no reward.
async fn reject_activity(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<Activity>> {
    let activity = fraud_service(&state)
        .reject_activity(id, &admin.user_id, &request.reason)
        .await?;
    Ok(Json(activity))
}

#[derive(Deserialize)]
struct FlagRequest {
    reason: String,
}

/// Manually flag an activity for review.
async fn flag_activity(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<FlagRequest>,
) -> Result<Json<Activity>> {
    let activity = fraud_service(&state)
        .flag_activity(id, &request.reason, Some(&admin.user_id))
        .await?;
    Ok(Json(activity))
}
