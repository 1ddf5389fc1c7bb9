// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! League/competition contest model and scoring formulas.
//!
//! A league and a competition share the same scoring machinery: a scoring
//! metric type, an activity-type filter, and per-activity-type multipliers.
//! Rankings are always derived from member scores, never hand-edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::activity::{Activity, ActivityType};

/// What a contest measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringType {
    /// Kilometers per activity
    Distance,
    /// Elevation gain in meters
    Elevation,
    /// Minutes per activity
    Duration,
    /// Calories burned
    Calories,
    /// Flat score per activity
    Frequency,
    /// Placeholder: scored as frequency until streak counting lands
    Streak,
}

/// Whether this contest is a standing league or a one-off competition.
/// Both kinds score identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestKind {
    League,
    Competition,
}

/// One score event appended to a member's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub date: DateTime<Utc>,
    /// Contribution applied by this entry (not the cumulative score)
    pub score: f64,
    pub activity_ids: Vec<Uuid>,
}

/// A user's standing inside one league or competition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueMember {
    pub user_id: String,
    /// Cumulative score, rounded to 2 decimals at each update
    pub score: f64,
    /// 1-based rank, derived from the score list; 0 until first ranking
    pub rank: u32,
    /// Monotonic per-league counter assigned at join; the explicit
    /// tie-break key so equal scores rank in join order
    pub join_order: u64,
    /// Soft removal marker; left members keep their record but are
    /// excluded from ranking and scoring
    pub left_at: Option<DateTime<Utc>>,
    /// Append-only score history
    pub history: Vec<ScoreEntry>,
    pub joined_at: DateTime<Utc>,
}

impl LeagueMember {
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// A scored group contest over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    pub id: Uuid,
    pub name: String,
    pub kind: ContestKind,
    pub scoring: ScoringType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Accepted activity types; empty means all types count
    pub activity_types: Vec<ActivityType>,
    /// Per-activity-type score multipliers (default 1.0)
    pub multipliers: HashMap<ActivityType, f64>,
    /// Creator user ID; the creator cannot leave
    pub created_by: String,
    pub is_private: bool,
    /// Access code required to join private leagues
    pub access_code: Option<String>,
    pub max_participants: Option<u32>,
    pub members: Vec<LeagueMember>,
    /// Next join_order value to hand out
    pub next_join_order: u64,
    /// Activities already applied to this league (idempotency per
    /// `(activity, league)` pair)
    pub scored_activity_ids: HashSet<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl League {
    /// Whether `at` falls inside the contest window.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_date && at <= self.end_date
    }

    /// Whether the activity-type filter accepts this type.
    pub fn accepts_type(&self, activity_type: ActivityType) -> bool {
        self.activity_types.is_empty() || self.activity_types.contains(&activity_type)
    }

    pub fn member(&self, user_id: &str) -> Option<&LeagueMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn member_mut(&mut self, user_id: &str) -> Option<&mut LeagueMember> {
        self.members.iter_mut().find(|m| m.user_id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.user_id == user_id && m.is_active())
    }

    pub fn active_member_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_active()).count()
    }

    /// Score contribution of one activity to this contest.
    ///
    /// Returns 0.0 when the activity-type filter rejects the activity.
    /// The contest-window check is the caller's job (the scoring engine
    /// already filters on the activity's start time).
    pub fn contribution_for(&self, activity: &Activity) -> f64 {
        if !self.accepts_type(activity.activity_type) {
            return 0.0;
        }

        let multiplier = self
            .multipliers
            .get(&activity.activity_type)
            .copied()
            .unwrap_or(1.0);

        let metric = match self.scoring {
            ScoringType::Distance => activity.distance_meters.unwrap_or(0.0) / 1000.0,
            ScoringType::Elevation => activity.elevation_gain.unwrap_or(0.0),
            ScoringType::Duration => activity.duration_secs as f64 / 60.0,
            ScoringType::Calories => activity.calories.unwrap_or(0) as f64,
            ScoringType::Frequency => 1.0,
            // TODO(streaks): count consecutive active days instead of a
            // flat score once streak tracking is stored per member
            ScoringType::Streak => 1.0,
        };

        round2(metric * multiplier)
    }

    /// Re-sort members and reassign ranks.
    ///
    /// Active members sort by `(score desc, join_order asc)` and take ranks
    /// 1..N in that order. The composite key makes the ordering independent
    /// of sort stability, so repeated runs never reorder equal scores.
    /// Left members sort after all active ones and keep rank 0.
    pub fn update_rankings(&mut self) {
        self.members.sort_by(|a, b| {
            b.is_active()
                .cmp(&a.is_active())
                .then(b.score.total_cmp(&a.score))
                .then(a.join_order.cmp(&b.join_order))
        });

        let mut rank = 0u32;
        for member in self.members.iter_mut() {
            if member.is_active() {
                rank += 1;
                member.rank = rank;
            } else {
                member.rank = 0;
            }
        }
    }
}

/// Round to 2 decimal places, the precision of all league scores.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityStatus;

    fn test_league(scoring: ScoringType, activity_types: Vec<ActivityType>) -> League {
        let now = Utc::now();
        League {
            id: Uuid::new_v4(),
            name: "Test League".to_string(),
            kind: ContestKind::League,
            scoring,
            start_date: now - chrono::Duration::days(7),
            end_date: now + chrono::Duration::days(7),
            activity_types,
            multipliers: HashMap::new(),
            created_by: "creator".to_string(),
            is_private: false,
            access_code: None,
            max_participants: None,
            members: vec![],
            next_join_order: 0,
            scored_activity_ids: HashSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn member(user_id: &str, score: f64, join_order: u64) -> LeagueMember {
        LeagueMember {
            user_id: user_id.to_string(),
            score,
            rank: 0,
            join_order,
            left_at: None,
            history: vec![],
            joined_at: Utc::now(),
        }
    }

    fn activity(activity_type: ActivityType, distance: Option<f64>) -> Activity {
        let now = Utc::now();
        Activity {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            source: "strava".to_string(),
            source_id: "ext-1".to_string(),
            activity_type,
            start_time: now,
            end_time: now,
            duration_secs: 3600,
            distance_meters: distance,
            calories: Some(400),
            elevation_gain: Some(120.0),
            status: ActivityStatus::Verified,
            processed: true,
            fraud_score: 0,
            fraud_reasons: vec![],
            points: Some(100),
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn distance_contribution_uses_km_and_multiplier() {
        let mut league = test_league(ScoringType::Distance, vec![ActivityType::Running]);
        league.multipliers.insert(ActivityType::Running, 2.0);

        let contribution =
            league.contribution_for(&activity(ActivityType::Running, Some(10_000.0)));

        assert_eq!(contribution, 20.0);
    }

    #[test]
    fn filtered_type_contributes_zero() {
        let league = test_league(ScoringType::Distance, vec![ActivityType::Running]);

        let contribution =
            league.contribution_for(&activity(ActivityType::Cycling, Some(10_000.0)));

        assert_eq!(contribution, 0.0);
    }

    #[test]
    fn empty_type_filter_accepts_all() {
        let league = test_league(ScoringType::Frequency, vec![]);

        let contribution = league.contribution_for(&activity(ActivityType::Yoga, None));

        assert_eq!(contribution, 1.0);
    }

    #[test]
    fn duration_contribution_is_minutes() {
        let league = test_league(ScoringType::Duration, vec![]);

        let contribution = league.contribution_for(&activity(ActivityType::Running, None));

        assert_eq!(contribution, 60.0);
    }

    #[test]
    fn contribution_rounds_to_two_decimals() {
        let league = test_league(ScoringType::Distance, vec![]);

        let contribution = league.contribution_for(&activity(ActivityType::Running, Some(333.0)));

        assert_eq!(contribution, 0.33);
    }

    #[test]
    fn rankings_sort_descending_with_join_order_tie_break() {
        let mut league = test_league(ScoringType::Distance, vec![]);
        // Scores [50, 100, 100, 75] in join order
        league.members = vec![
            member("a", 50.0, 0),
            member("b", 100.0, 1),
            member("c", 100.0, 2),
            member("d", 75.0, 3),
        ];

        league.update_rankings();

        let ranks: Vec<(String, u32)> = league
            .members
            .iter()
            .map(|m| (m.user_id.clone(), m.rank))
            .collect();
        assert_eq!(
            ranks,
            vec![
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 3),
                ("a".to_string(), 4),
            ]
        );
    }

    #[test]
    fn rankings_are_stable_across_repeated_runs() {
        let mut league = test_league(ScoringType::Distance, vec![]);
        league.members = vec![
            member("first", 100.0, 0),
            member("second", 100.0, 1),
        ];

        league.update_rankings();
        let first_pass: Vec<String> = league.members.iter().map(|m| m.user_id.clone()).collect();
        league.update_rankings();
        let second_pass: Vec<String> = league.members.iter().map(|m| m.user_id.clone()).collect();

        assert_eq!(first_pass, second_pass);
        assert_eq!(league.members[0].user_id, "first");
        assert_eq!(league.members[0].rank, 1);
        assert_eq!(league.members[1].rank, 2);
    }

    #[test]
    fn left_members_are_excluded_from_ranking() {
        let mut league = test_league(ScoringType::Distance, vec![]);
        let mut gone = member("gone", 500.0, 0);
        gone.left_at = Some(Utc::now());
        league.members = vec![gone, member("stays", 10.0, 1)];

        league.update_rankings();

        assert_eq!(league.member("stays").unwrap().rank, 1);
        assert_eq!(league.member("gone").unwrap().rank, 0);
        assert_eq!(league.active_member_count(), 1);
    }
}
