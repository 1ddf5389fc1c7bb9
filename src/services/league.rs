// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! League/competition lifecycle and the contest scoring engine.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    ActivityStatus, ActivityType, ContestKind, League, ScoringType,
};
use crate::store::{ActivityStore, ApplyOutcome, LeagueStore, Store};

/// Parameters for creating a league or competition.
#[derive(Debug, Clone)]
pub struct CreateLeague {
    pub name: String,
    pub kind: ContestKind,
    pub scoring: ScoringType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Empty accepts every activity type
    pub activity_types: Vec<ActivityType>,
    pub multipliers: HashMap<ActivityType, f64>,
    pub is_private: bool,
    pub access_code: Option<String>,
    pub max_participants: Option<u32>,
}

/// One leaderboard row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub score: f64,
}

/// League service: lifecycle operations plus the queue consumer side of
/// the contest scoring stage.
pub struct LeagueService {
    store: Arc<dyn Store>,
}

impl LeagueService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a contest. The creator becomes member #1 and cannot leave.
    pub async fn create(&self, created_by: &str, params: CreateLeague) -> Result<League> {
        if params.end_date <= params.start_date {
            return Err(AppError::BadRequest(
                "end_date must be after start_date".to_string(),
            ));
        }
        if params.name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        if params.is_private && params.access_code.is_none() {
            return Err(AppError::BadRequest(
                "private leagues need an access code".to_string(),
            ));
        }

        let now = Utc::now();
        // The creator is member #1 from the start, even for contests whose
        // window has not opened yet (join_league enforces the window).
        let creator = crate::models::LeagueMember {
            user_id: created_by.to_string(),
            score: 0.0,
            rank: 1,
            join_order: 0,
            left_at: None,
            history: vec![],
            joined_at: now,
        };

        let league = League {
            id: Uuid::new_v4(),
            name: params.name,
            kind: params.kind,
            scoring: params.scoring,
            start_date: params.start_date,
            end_date: params.end_date,
            activity_types: params.activity_types,
            multipliers: params.multipliers,
            created_by: created_by.to_string(),
            is_private: params.is_private,
            access_code: params.access_code,
            max_participants: params.max_participants,
            members: vec![creator],
            next_join_order: 1,
            scored_activity_ids: Default::default(),
            created_at: now,
            updated_at: now,
        };

        let league = self.store.insert_league(league).await?;

        tracing::info!(
            league_id = %league.id,
            created_by = %created_by,
            scoring = ?league.scoring,
            "League created"
        );
        Ok(league)
    }

    pub async fn get(&self, league_id: Uuid) -> Result<League> {
        self.store
            .get_league(league_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))
    }

    pub async fn join(
        &self,
        league_id: Uuid,
        user_id: &str,
        access_code: Option<&str>,
    ) -> Result<League> {
        let league = self
            .store
            .join_league(league_id, user_id, access_code, Utc::now())
            .await?;
        tracing::info!(league_id = %league_id, user_id = %user_id, "User joined league");
        Ok(league)
    }

    pub async fn leave(&self, league_id: Uuid, user_id: &str) -> Result<()> {
        self.store
            .leave_league(league_id, user_id, Utc::now())
            .await?;
        tracing::info!(league_id = %league_id, user_id = %user_id, "User left league");
        Ok(())
    }

    /// Ranked standings: active members ordered by the rank invariant.
    pub async fn leaderboard(&self, league_id: Uuid) -> Result<Vec<LeaderboardEntry>> {
        let league = self.get(league_id).await?;

        let mut entries: Vec<LeaderboardEntry> = league
            .members
            .iter()
            .filter(|m| m.is_active())
            .map(|m| LeaderboardEntry {
                rank: m.rank,
                user_id: m.user_id.clone(),
                score: m.score,
            })
            .collect();
        entries.sort_by_key(|e| e.rank);
        Ok(entries)
    }

    /// Process one league-score message: apply the activity to every
    /// eligible contest of the user (or to one targeted league).
    ///
    /// Idempotent per `(activity, league)`; a retried message re-applies
    /// nothing that already committed.
    pub async fn score_activity(&self, activity_id: Uuid, league_id: Option<Uuid>) -> Result<()> {
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
                    "Activity not eligible for league scoring"
                );
                return Ok(());
            }
            ActivityStatus::Pending => {
                return Err(AppError::BadRequest(format!(
                    "Activity {} has no fraud verdict yet",
                    activity_id
                )));
            }
            ActivityStatus::Verified if !activity.processed => {
                // Reward stage has not committed; retry preserves order
                return Err(AppError::BadRequest(format!(
                    "Activity {} is not scored yet",
                    activity_id
                )));
            }
            ActivityStatus::Verified => {}
        }

        let leagues = match league_id {
            Some(id) => vec![self.get(id).await?],
            None => self.store.leagues_for_user(&activity.user_id).await?,
        };

        for league in leagues {
            if !league.is_active_at(activity.start_time) {
                tracing::debug!(
                    league_id = %league.id,
                    activity_id = %activity_id,
                    "Activity outside league window"
                );
                continue;
            }

            let contribution = league.contribution_for(&activity);
            if contribution == 0.0 {
                tracing::debug!(
                    league_id = %league.id,
                    activity_id = %activity_id,
                    activity_type = %activity.activity_type,
                    "Zero contribution, skipping"
                );
                continue;
            }

            let outcome = self
                .store
                .apply_contribution(
                    league.id,
                    &activity.user_id,
                    activity_id,
                    contribution,
                    activity.start_time,
                )
                .await?;

            match outcome {
                ApplyOutcome::Applied {
                    contribution,
                    new_score,
                    new_rank,
                } => {
                    tracing::info!(
                        league_id = %league.id,
                        activity_id = %activity_id,
                        user_id = %activity.user_id,
                        contribution,
                        new_score,
                        new_rank,
                        "League contribution applied"
                    );
                }
                ApplyOutcome::AlreadyScored => {
                    tracing::debug!(
                        league_id = %league.id,
                        activity_id = %activity_id,
                        "Contribution already applied (idempotent skip)"
                    );
                }
                ApplyOutcome::NotMember => {
                    tracing::warn!(
                        league_id = %league.id,
                        user_id = %activity.user_id,
                        "User is not an active member, skipping"
                    );
                }
            }
        }

        Ok(())
    }
}
