//! Flag submission and scoring.
//!
//! Every attempt — correct or not — appends one submission row; solved
//! state and scores are always folded from that log, never mutated in
//! place. Duplicate correct submissions therefore tolerate racing tabs
//! without locking and never double-count.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use fv_store::models::{ChallengeRow, SubmissionRow};
use fv_store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum CtfError {
    #[error("Challenge not found")]
    ChallengeNotFound,

    #[error("Challenge is not active")]
    ChallengeInactive,

    #[error("Flag must not be empty")]
    EmptyFlag,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CtfError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => CtfError::ChallengeNotFound,
            other => CtfError::Store(other),
        }
    }
}

/// Challenge as shown to players: everything except the solution flag.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub points: i64,
    pub hints: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub solved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub total_points: i64,
    pub solved_count: u32,
    /// When the user's most recent counted solve landed — the tie-break.
    pub last_solve_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Ctf {
    store: Store,
}

impl Ctf {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record one attempt. The candidate is trimmed of surrounding
    /// whitespace, then compared byte-for-byte (case-sensitive) against the
    /// stored solution. Inactive challenges are rejected before anything is
    /// written. Exactly one submission row per call.
    pub async fn submit(
        &self,
        user_id: &str,
        challenge_id: &str,
        candidate_flag: &str,
    ) -> Result<SubmissionRow, CtfError> {
        let candidate = candidate_flag.trim();
        if candidate.is_empty() {
            return Err(CtfError::EmptyFlag);
        }

        let challenge = self.store.challenge_by_id(challenge_id).await?;
        if !challenge.is_active {
            return Err(CtfError::ChallengeInactive);
        }

        let is_correct = candidate.as_bytes() == challenge.flag.as_bytes();
        let row = self
            .store
            .insert_submission(user_id, challenge_id, candidate, is_correct)
            .await?;

        info!(user_id, challenge_id, is_correct, "flag submitted");
        Ok(row)
    }

    /// True iff at least one correct submission exists for the pair.
    pub async fn is_solved(&self, user_id: &str, challenge_id: &str) -> Result<bool, CtfError> {
        Ok(self.store.has_correct_submission(user_id, challenge_id).await?)
    }

    /// A user's attempt history for one challenge, most recent first.
    pub async fn attempts(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Vec<SubmissionRow>, CtfError> {
        Ok(self.store.submissions_for_challenge(user_id, challenge_id).await?)
    }

    /// Active challenges with this user's solved markers, flags stripped.
    pub async fn browse(&self, user_id: &str) -> Result<Vec<ChallengeSummary>, CtfError> {
        let challenges = self.store.active_challenges().await?;
        let solved: HashSet<String> = self
            .store
            .solved_challenge_ids(user_id)
            .await?
            .into_iter()
            .collect();

        challenges
            .into_iter()
            .map(|c| {
                let hints = c.hint_list().map_err(StoreError::Serialisation)?;
                Ok(ChallengeSummary {
                    solved: solved.contains(&c.id),
                    id: c.id,
                    title: c.title,
                    description: c.description,
                    category: c.category,
                    difficulty: c.difficulty,
                    points: c.points,
                    hints,
                    created_at: c.created_at,
                })
            })
            .collect()
    }

    /// Recompute the leaderboard from the submission log. Never cached.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, CtfError> {
        let submissions = self.store.correct_submissions().await?;
        let challenges = self.store.all_challenges().await?;
        let names: HashMap<String, Option<String>> =
            self.store.user_display_names().await?.into_iter().collect();
        Ok(compute_leaderboard(&submissions, &challenges, &names))
    }
}

/// Pure fold from correct submissions (oldest first) to a ranked board.
///
/// A user's first correct submission per challenge counts; later ones are
/// ignored, so resubmitting a solved challenge can never change a total.
/// Ordering: total points descending, then earliest `last_solve_at`
/// (whoever reached their set of solves first ranks higher), then user id.
pub fn compute_leaderboard(
    correct_submissions: &[SubmissionRow],
    challenges: &[ChallengeRow],
    display_names: &HashMap<String, Option<String>>,
) -> Vec<LeaderboardEntry> {
    let points_by_challenge: HashMap<&str, i64> = challenges
        .iter()
        .map(|c| (c.id.as_str(), c.points))
        .collect();

    struct Tally {
        points: i64,
        solved: HashSet<String>,
        last_solve_at: DateTime<Utc>,
    }

    let mut tallies: HashMap<String, Tally> = HashMap::new();
    for sub in correct_submissions {
        debug_assert!(sub.is_correct);
        let Some(points) = points_by_challenge.get(sub.challenge_id.as_str()) else {
            continue; // submission against a challenge we no longer know
        };
        let tally = tallies.entry(sub.user_id.clone()).or_insert_with(|| Tally {
            points: 0,
            solved: HashSet::new(),
            last_solve_at: sub.submitted_at,
        });
        if tally.solved.insert(sub.challenge_id.clone()) {
            tally.points += points;
            tally.last_solve_at = sub.submitted_at;
        }
    }

    let mut board: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(user_id, tally)| LeaderboardEntry {
            display_name: display_names
                .get(&user_id)
                .and_then(|n| n.clone())
                .unwrap_or_else(|| "Anonymous".to_string()),
            user_id,
            total_points: tally.points,
            solved_count: tally.solved.len() as u32,
            last_solve_at: tally.last_solve_at,
        })
        .collect();

    board.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.last_solve_at.cmp(&b.last_solve_at))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn challenge(id: &str, points: i64) -> ChallengeRow {
        ChallengeRow {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            category: "web".into(),
            difficulty: "easy".into(),
            points,
            flag: "flag{x}".into(),
            is_active: true,
            hints: None,
            created_by: "admin".into(),
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    fn correct(user: &str, challenge: &str, at_secs: i64) -> SubmissionRow {
        SubmissionRow {
            id: format!("{user}-{challenge}-{at_secs}"),
            user_id: user.into(),
            challenge_id: challenge.into(),
            submitted_flag: "flag{x}".into(),
            is_correct: true,
            submitted_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    #[test]
    fn duplicate_solves_count_once() {
        let challenges = vec![challenge("a", 20), challenge("b", 30)];
        let submissions = vec![
            correct("u1", "a", 10),
            correct("u1", "a", 20), // resubmission of a solved challenge
            correct("u1", "b", 30),
        ];
        let board = compute_leaderboard(&submissions, &challenges, &HashMap::new());
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].total_points, 50);
        assert_eq!(board[0].solved_count, 2);
    }

    #[test]
    fn ties_break_by_earliest_finish_then_user_id() {
        let challenges = vec![challenge("a", 20), challenge("b", 20)];
        let submissions = vec![
            correct("late", "a", 50),
            correct("early", "b", 10),
        ];
        let board = compute_leaderboard(&submissions, &challenges, &HashMap::new());
        assert_eq!(board[0].user_id, "early");
        assert_eq!(board[1].user_id, "late");

        // Identical timestamps: user id decides, deterministically.
        let submissions = vec![correct("bob", "a", 10), correct("alice", "b", 10)];
        let board = compute_leaderboard(&submissions, &challenges, &HashMap::new());
        assert_eq!(board[0].user_id, "alice");
    }

    #[test]
    fn deterministic_across_recomputation() {
        let challenges = vec![challenge("a", 20), challenge("b", 30), challenge("c", 10)];
        let submissions = vec![
            correct("u1", "a", 1),
            correct("u2", "b", 2),
            correct("u3", "c", 3),
            correct("u1", "c", 4),
            correct("u3", "a", 5),
        ];
        let first = compute_leaderboard(&submissions, &challenges, &HashMap::new());
        let second = compute_leaderboard(&submissions, &challenges, &HashMap::new());
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_challenges_are_skipped() {
        let challenges = vec![challenge("a", 20)];
        let submissions = vec![correct("u1", "a", 1), correct("u1", "ghost", 2)];
        let board = compute_leaderboard(&submissions, &challenges, &HashMap::new());
        assert_eq!(board[0].total_points, 20);
        assert_eq!(board[0].solved_count, 1);
    }
}
