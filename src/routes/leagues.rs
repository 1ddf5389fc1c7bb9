// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! League and competition routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityType, ContestKind, League, ScoringType};
use crate::services::{CreateLeague, LeaderboardEntry, LeagueService};
use crate::store::LeagueStore;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// League routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leagues", post(create_league).get(my_leagues))
        .route("/api/leagues/{id}", get(get_league))
        .route("/api/leagues/{id}/join", post(join_league))
        .route("/api/leagues/{id}/leave", post(leave_league))
}

/// Public league routes (no authentication).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/leagues/{id}/leaderboard", get(get_leaderboard))
}

#[derive(Deserialize)]
struct CreateLeagueRequest {
    name: String,
    #[serde(default = "default_kind")]
    kind: ContestKind,
    scoring: ScoringType,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    #[serde(default)]
    activity_types: Vec<ActivityType>,
    #[serde(default)]
    multipliers: HashMap<ActivityType, f64>,
    #[serde(default)]
    is_private: bool,
    access_code: Option<String>,
    max_participants: Option<u32>,
}

fn default_kind() -> ContestKind {
    ContestKind::League
}

/// League view returned to members; never exposes the access code.
#[derive(Serialize)]
struct LeagueResponse {
    id: Uuid,
    name: String,
    kind: ContestKind,
    scoring: ScoringType,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    activity_types: Vec<ActivityType>,
    is_private: bool,
    member_count: usize,
    user_rank: Option<u32>,
    user_score: Option<f64>,
    leader_score: f64,
}

impl LeagueResponse {
    fn for_user(league: &League, user_id: &str) -> Self {
        let member = league.member(user_id).filter(|m| m.is_active());
        let leader_score = league
            .members
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.score)
            .fold(0.0, f64::max);

        Self {
            id: league.id,
            name: league.name.clone(),
            kind: league.kind,
            scoring: league.scoring,
            start_date: league.start_date,
            end_date: league.end_date,
            activity_types: league.activity_types.clone(),
            is_private: league.is_private,
            member_count: league.active_member_count(),
            user_rank: member.map(|m| m.rank),
            user_score: member.map(|m| m.score),
            leader_score,
        }
    }
}

/// Create a league or competition; the creator joins as member #1.
async fn create_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateLeagueRequest>,
) -> Result<(StatusCode, Json<LeagueResponse>)> {
    let service = LeagueService::new(state.store.clone());
    let league = service
        .create(
            &user.user_id,
            CreateLeague {
                name: request.name,
                kind: request.kind,
                scoring: request.scoring,
                start_date: request.start_date,
                end_date: request.end_date,
                activity_types: request.activity_types,
                multipliers: request.multipliers,
                is_private: request.is_private,
                access_code: request.access_code,
                max_participants: request.max_participants,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LeagueResponse::for_user(&league, &user.user_id)),
    ))
}

/// Leagues the user belongs to.
async fn my_leagues(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<LeagueResponse>>> {
    let leagues = state.store.leagues_for_user(&user.user_id).await?;
    Ok(Json(
        leagues
            .iter()
            .map(|l| LeagueResponse::for_user(l, &user.user_id))
            .collect(),
    ))
}

async fn get_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeagueResponse>> {
    let league = LeagueService::new(state.store.clone()).get(id).await?;
    Ok(Json(LeagueResponse::for_user(&league, &user.user_id)))
}

#[derive(Deserialize, Default)]
struct JoinRequest {
    access_code: Option<String>,
}

async fn join_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    request: Option<Json<JoinRequest>>,
) -> Result<Json<LeagueResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let league = LeagueService::new(state.store.clone())
        .join(id, &user.user_id, request.access_code.as_deref())
        .await?;
    Ok(Json(LeagueResponse::for_user(&league, &user.user_id)))
}

#[derive(Serialize)]
struct LeaveResponse {
    success: bool,
}

async fn leave_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaveResponse>> {
    LeagueService::new(state.store.clone())
        .leave(id, &user.user_id)
        .await?;
    Ok(Json(LeaveResponse { success: true }))
}

/// Ranked standings, ordered by the rank invariant.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let entries = LeagueService::new(state.store.clone()).leaderboard(id).await?;
    Ok(Json(entries))
}
