//! Challenge and submission queries.
//!
//! Submissions are append-only: only INSERT is exposed. Challenge points
//! and flag are immutable after insert — the only mutation the store allows
//! is flipping `is_active`.

use chrono::Utc;
use uuid::Uuid;

use crate::db::Store;
use crate::error::StoreError;
use crate::models::{ChallengeRow, Difficulty, SubmissionRow};

pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub points: i64,
    pub flag: String,
    pub hints: Vec<String>,
    pub created_by: String,
}

impl Store {
    pub async fn insert_challenge(&self, new: NewChallenge) -> Result<ChallengeRow, StoreError> {
        let id = Uuid::new_v4().to_string();
        let hints = if new.hints.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&new.hints)?)
        };
        sqlx::query(
            "INSERT INTO challenges (id, title, description, category, difficulty, points, flag, is_active, hints, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.difficulty.as_str())
        .bind(new.points)
        .bind(&new.flag)
        .bind(&hints)
        .bind(&new.created_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.challenge_by_id(&id).await
    }

    pub async fn challenge_by_id(&self, id: &str) -> Result<ChallengeRow, StoreError> {
        sqlx::query_as::<_, ChallengeRow>("SELECT * FROM challenges WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("challenge {id}")))
    }

    /// Active challenges ordered the way the browsing UI lists them.
    pub async fn active_challenges(&self) -> Result<Vec<ChallengeRow>, StoreError> {
        Ok(sqlx::query_as::<_, ChallengeRow>(
            "SELECT * FROM challenges WHERE is_active = 1 \
             ORDER BY CASE difficulty WHEN 'easy' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END, points",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn all_challenges(&self) -> Result<Vec<ChallengeRow>, StoreError> {
        Ok(sqlx::query_as::<_, ChallengeRow>("SELECT * FROM challenges")
            .fetch_all(&self.pool)
            .await?)
    }

    /// Retire or republish a challenge. Points and flag stay frozen.
    pub async fn set_challenge_active(&self, id: &str, active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE challenges SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("challenge {id}")));
        }
        Ok(())
    }

    // ── Submissions (append-only) ────────────────────────────────────────────

    pub async fn insert_submission(
        &self,
        user_id: &str,
        challenge_id: &str,
        submitted_flag: &str,
        is_correct: bool,
    ) -> Result<SubmissionRow, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO submissions (id, user_id, challenge_id, submitted_flag, is_correct, submitted_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(challenge_id)
        .bind(submitted_flag)
        .bind(is_correct)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(SubmissionRow {
            id,
            user_id: user_id.to_string(),
            challenge_id: challenge_id.to_string(),
            submitted_flag: submitted_flag.to_string(),
            is_correct,
            submitted_at: now,
        })
    }

    /// A user's attempts for one challenge, most recent first.
    pub async fn submissions_for_challenge(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Vec<SubmissionRow>, StoreError> {
        Ok(sqlx::query_as::<_, SubmissionRow>(
            "SELECT * FROM submissions WHERE user_id = ? AND challenge_id = ? ORDER BY submitted_at DESC",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn has_correct_submission(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM submissions WHERE user_id = ? AND challenge_id = ? AND is_correct = 1",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Every correct submission, oldest first — the leaderboard fold input.
    pub async fn correct_submissions(&self) -> Result<Vec<SubmissionRow>, StoreError> {
        Ok(sqlx::query_as::<_, SubmissionRow>(
            "SELECT * FROM submissions WHERE is_correct = 1 ORDER BY submitted_at, id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Challenge ids this user has solved (distinct).
    pub async fn solved_challenge_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT challenge_id FROM submissions WHERE user_id = ? AND is_correct = 1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::VaultSession;
    use crate::users::NewUser;
    use tempfile::tempdir;

    async fn store_with_user() -> (tempfile::TempDir, Store, String) {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("fv.db"), VaultSession::new())
            .await
            .unwrap();
        let user = store
            .insert_user(NewUser {
                email: "a@example.com".into(),
                password_hash: "$argon2id$stub".into(),
                display_name: None,
                vault_salt_hex: hex::encode(fv_crypto::kdf::generate_salt()),
            })
            .await
            .unwrap();
        (dir, store, user.id)
    }

    fn challenge(title: &str, points: i64) -> NewChallenge {
        NewChallenge {
            title: title.into(),
            description: "find the flag".into(),
            category: "web".into(),
            difficulty: Difficulty::Easy,
            points,
            flag: "flag{right}".into(),
            hints: vec!["look closer".into()],
            created_by: "admin".into(),
        }
    }

    #[tokio::test]
    async fn challenge_insert_and_listing() {
        let (_dir, store, _user) = store_with_user().await;
        let row = store.insert_challenge(challenge("Alpha", 20)).await.unwrap();
        assert!(row.is_active);
        assert_eq!(row.hint_list().unwrap(), vec!["look closer".to_string()]);
        assert_eq!(row.difficulty(), Some(Difficulty::Easy));

        assert_eq!(store.active_challenges().await.unwrap().len(), 1);
        store.set_challenge_active(&row.id, false).await.unwrap();
        assert!(store.active_challenges().await.unwrap().is_empty());
        // Still reachable for scoring lookups.
        assert!(store.challenge_by_id(&row.id).await.is_ok());
    }

    #[tokio::test]
    async fn submissions_append_and_derive_solved() {
        let (_dir, store, user_id) = store_with_user().await;
        let ch = store.insert_challenge(challenge("Alpha", 20)).await.unwrap();

        store
            .insert_submission(&user_id, &ch.id, "flag{wrong}", false)
            .await
            .unwrap();
        assert!(!store.has_correct_submission(&user_id, &ch.id).await.unwrap());

        store
            .insert_submission(&user_id, &ch.id, "flag{right}", true)
            .await
            .unwrap();
        assert!(store.has_correct_submission(&user_id, &ch.id).await.unwrap());

        // Every attempt is kept, newest first.
        let attempts = store.submissions_for_challenge(&user_id, &ch.id).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].is_correct);

        // Duplicate correct submissions persist but solved ids stay distinct.
        store
            .insert_submission(&user_id, &ch.id, "flag{right}", true)
            .await
            .unwrap();
        assert_eq!(store.solved_challenge_ids(&user_id).await.unwrap().len(), 1);
    }
}
