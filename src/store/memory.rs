// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store backend.
//!
//! Reference implementation of the store traits, used by the binary and
//! the test suite. DashMap entry guards give exclusive access to one
//! record at a time, which is what the conditional updates and the
//! single-writer-per-league discipline need.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::league::round2;
use crate::models::{
    Activity, ActivityEffort, ActivityStatus, League, LeagueMember, ScoreEntry, SportProfile,
};
use crate::store::{ActivityFilter, ActivityStore, ApplyOutcome, IngestOutcome, LeagueStore,
    ProfileStore};

/// Key of the ingestion idempotency index.
type SourceKey = (String, String, String);

/// In-memory store over concurrent maps.
#[derive(Default)]
pub struct MemoryStore {
    activities: DashMap<Uuid, Activity>,
    /// `(user_id, source, source_id)` -> activity id
    source_index: DashMap<SourceKey, Uuid>,
    leagues: DashMap<Uuid, League>,
    profiles: DashMap<String, SportProfile>,
    /// Effort records per user, in insertion order
    efforts: DashMap<String, Vec<ActivityEffort>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(activity: &Activity, filter: &ActivityFilter) -> bool {
    if let Some(user_id) = &filter.user_id {
        if &activity.user_id != user_id {
            return false;
        }
    }
    if let Some(source) = &filter.source {
        if &activity.source != source {
            return false;
        }
    }
    if let Some(activity_type) = filter.activity_type {
        if activity.activity_type != activity_type {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if activity.status != status {
            return false;
        }
    }
    if let Some(after) = filter.start_after {
        if activity.start_time < after {
            return false;
        }
    }
    if let Some(before) = filter.start_before {
        if activity.start_time > before {
            return false;
        }
    }
    true
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert_activity_if_absent(&self, activity: Activity) -> Result<IngestOutcome> {
        let key = (
            activity.user_id.clone(),
            activity.source.clone(),
            activity.source_id.clone(),
        );

        // The index entry guard serializes concurrent ingests of the same
        // (user, source, source_id); the activity record is inserted before
        // the index entry becomes visible.
        match self.source_index.entry(key) {
            Entry::Occupied(entry) => {
                let existing = self
                    .activities
                    .get(entry.get())
                    .map(|a| a.clone())
                    .ok_or_else(|| {
                        AppError::Database("source index points at missing activity".to_string())
                    })?;
                Ok(IngestOutcome::Duplicate(existing))
            }
            Entry::Vacant(entry) => {
                let id = activity.id;
                self.activities.insert(id, activity.clone());
                entry.insert(id);
                Ok(IngestOutcome::Created(activity))
            }
        }
    }

    async fn get_activity(&self, id: Uuid) -> Result<Option<Activity>> {
        Ok(self.activities.get(&id).map(|a| a.clone()))
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let mut matched: Vec<Activity> = self
            .activities
            .iter()
            .filter(|entry| matches_filter(entry.value(), filter))
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; id as secondary key for a deterministic order
        matched.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)));

        let offset = filter.offset.unwrap_or(0) as usize;
        let matched = matched.into_iter().skip(offset);
        Ok(match filter.limit {
            Some(limit) => matched.take(limit as usize).collect(),
            None => matched.collect(),
        })
    }

    async fn count_activities(&self, filter: &ActivityFilter) -> Result<u64> {
        let mut unpaged = filter.clone();
        unpaged.limit = None;
        unpaged.offset = None;
        Ok(self
            .activities
            .iter()
            .filter(|entry| matches_filter(entry.value(), &unpaged))
            .count() as u64)
    }

    async fn record_fraud_outcome(
        &self,
        id: Uuid,
        to: ActivityStatus,
        fraud_score: u32,
        fraud_reasons: &[String],
    ) -> Result<bool> {
        let mut activity = self
            .activities
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))?;

        if activity.status != ActivityStatus::Pending {
            return Ok(false);
        }

        activity.status = to;
        activity.fraud_score = fraud_score;
        activity.fraud_reasons = fraud_reasons.to_vec();
        activity.updated_at = Utc::now();
        Ok(true)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: &[ActivityStatus],
        to: ActivityStatus,
        reviewed_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool> {
        let mut activity = self
            .activities
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))?;

        if !from.contains(&activity.status) {
            return Ok(false);
        }

        activity.status = to;
        activity.reviewed_by = reviewed_by.map(String::from);
        activity.reviewed_at = Some(Utc::now());
        activity.review_notes = notes.map(String::from);
        activity.updated_at = Utc::now();
        Ok(true)
    }

    async fn complete_reward(&self, id: Uuid, points: u32) -> Result<bool> {
        let mut activity = self
            .activities
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))?;

        if activity.processed || activity.status != ActivityStatus::Verified {
            return Ok(false);
        }

        activity.points = Some(points);
        activity.processed = true;
        activity.updated_at = Utc::now();
        Ok(true)
    }

    async fn count_overlapping(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Uuid,
    ) -> Result<u64> {
        Ok(self
            .activities
            .iter()
            .filter(|entry| {
                let a = entry.value();
                a.user_id == user_id
                    && a.id != exclude
                    && a.start_time <= end
                    && a.end_time >= start
            })
            .count() as u64)
    }

    async fn count_same_day(&self, user_id: &str, at: DateTime<Utc>, exclude: Uuid) -> Result<u64> {
        let day = at.date_naive();
        Ok(self
            .activities
            .iter()
            .filter(|entry| {
                let a = entry.value();
                a.user_id == user_id && a.id != exclude && a.start_time.date_naive() == day
            })
            .count() as u64)
    }

    async fn sum_points_same_day(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
        exclude: Uuid,
    ) -> Result<u64> {
        let day = at.date_naive();
        Ok(self
            .activities
            .iter()
            .filter(|entry| {
                let a = entry.value();
                a.user_id == user_id && a.id != exclude && a.start_time.date_naive() == day
            })
            .filter_map(|entry| entry.value().points)
            .map(u64::from)
            .sum())
    }

    async fn count_flagged(&self, user_id: &str) -> Result<u64> {
        Ok(self
            .activities
            .iter()
            .filter(|entry| {
                let a = entry.value();
                a.user_id == user_id && a.status == ActivityStatus::Flagged
            })
            .count() as u64)
    }
}

#[async_trait]
impl LeagueStore for MemoryStore {
    async fn insert_league(&self, league: League) -> Result<League> {
        self.leagues.insert(league.id, league.clone());
        Ok(league)
    }

    async fn get_league(&self, id: Uuid) -> Result<Option<League>> {
        Ok(self.leagues.get(&id).map(|l| l.clone()))
    }

    async fn leagues_for_user(&self, user_id: &str) -> Result<Vec<League>> {
        let mut leagues: Vec<League> = self
            .leagues
            .iter()
            .filter(|entry| entry.value().is_member(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        leagues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(leagues)
    }

    async fn join_league(
        &self,
        league_id: Uuid,
        user_id: &str,
        access_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<League> {
        let mut league = self
            .leagues
            .get_mut(&league_id)
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))?;

        if !league.is_active_at(now) {
            return Err(AppError::BadRequest("League is not active".to_string()));
        }
        if league.is_member(user_id) {
            return Err(AppError::BadRequest(
                "Already a member of this league".to_string(),
            ));
        }
        if league.is_private {
            let expected = league.access_code.as_deref();
            if expected.is_none() || access_code != expected {
                return Err(AppError::Forbidden("Invalid access code".to_string()));
            }
        }
        if let Some(cap) = league.max_participants {
            if league.active_member_count() >= cap as usize {
                return Err(AppError::BadRequest(
                    "League has reached its participant limit".to_string(),
                ));
            }
        }

        if let Some(idx) = league.members.iter().position(|m| m.user_id == user_id) {
            // Rejoining after a soft leave reactivates the old record,
            // keeping its score, history, and tie-break position.
            league.members[idx].left_at = None;
        } else {
            let join_order = league.next_join_order;
            league.next_join_order += 1;
            league.members.push(LeagueMember {
                user_id: user_id.to_string(),
                score: 0.0,
                rank: 0,
                join_order,
                left_at: None,
                history: vec![],
                joined_at: now,
            });
        }

        league.update_rankings();
        league.updated_at = now;
        Ok(league.clone())
    }

    async fn leave_league(&self, league_id: Uuid, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut league = self
            .leagues
            .get_mut(&league_id)
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))?;

        if league.created_by == user_id {
            return Err(AppError::BadRequest(
                "The league creator cannot leave".to_string(),
            ));
        }
        if !league.is_member(user_id) {
            return Err(AppError::BadRequest(
                "Not a member of this league".to_string(),
            ));
        }

        if let Some(member) = league.member_mut(user_id) {
            member.left_at = Some(now);
        }
        league.update_rankings();
        league.updated_at = now;
        Ok(())
    }

    async fn apply_contribution(
        &self,
        league_id: Uuid,
        user_id: &str,
        activity_id: Uuid,
        contribution: f64,
        date: DateTime<Utc>,
    ) -> Result<ApplyOutcome> {
        // The entry guard is the per-league critical section: score
        // mutation, resort, and rank reassignment all commit before the
        // guard drops, so readers never see one without the others.
        let mut league = self
            .leagues
            .get_mut(&league_id)
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))?;

        if league.scored_activity_ids.contains(&activity_id) {
            return Ok(ApplyOutcome::AlreadyScored);
        }

        let Some(member) = league.member_mut(user_id).filter(|m| m.is_active()) else {
            return Ok(ApplyOutcome::NotMember);
        };

        member.score = round2(member.score + contribution);
        member.history.push(ScoreEntry {
            date,
            score: contribution,
            activity_ids: vec![activity_id],
        });
        let new_score = member.score;

        league.scored_activity_ids.insert(activity_id);
        league.update_rankings();
        league.updated_at = Utc::now();

        let new_rank = league
            .member(user_id)
            .map(|m| m.rank)
            .unwrap_or_default();

        Ok(ApplyOutcome::Applied {
            contribution,
            new_score,
            new_rank,
        })
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<SportProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn upsert_profile(&self, profile: &SportProfile) -> Result<()> {
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn insert_effort(&self, effort: &ActivityEffort) -> Result<()> {
        self.efforts
            .entry(effort.user_id.clone())
            .or_default()
            .push(effort.clone());
        Ok(())
    }

    async fn list_efforts(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<ActivityEffort>, u64)> {
        let Some(records) = self.efforts.get(user_id) else {
            return Ok((vec![], 0));
        };

        let total = records.len() as u64;
        let mut sorted: Vec<ActivityEffort> = records.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let page = sorted
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}
