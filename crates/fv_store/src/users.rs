//! User account and auth-session queries.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::Store;
use crate::error::StoreError;
use crate::models::{AuthSessionRow, UserRow};

/// Input for account creation. The password hash and vault salt are
/// produced by the caller (fv_core) before the row is written.
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub vault_salt_hex: String,
}

impl Store {
    pub async fn insert_user(&self, new: NewUser) -> Result<UserRow, StoreError> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, display_name, is_admin, two_factor_enabled, vault_salt, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 0, 0, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.display_name)
        .bind(&new.vault_salt_hex)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.user_by_id(&id).await
    }

    pub async fn user_by_id(&self, id: &str) -> Result<UserRow, StoreError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        Ok(sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn update_password_hash(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Store the passphrase verifier written on first vault unlock.
    pub async fn set_vault_verifier(
        &self,
        user_id: &str,
        verifier_b64: &str,
        nonce_hex: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET vault_verifier = ?, vault_verifier_nonce = ?, updated_at = ? WHERE id = ?",
        )
        .bind(verifier_b64)
        .bind(nonce_hex)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_two_factor(
        &self,
        user_id: &str,
        enabled: bool,
        totp_secret_hex: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET two_factor_enabled = ?, totp_secret = ?, updated_at = ? WHERE id = ?",
        )
        .bind(enabled)
        .bind(totp_secret_hex)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// (user id, display name) pairs for leaderboard rendering.
    pub async fn user_display_names(&self) -> Result<Vec<(String, Option<String>)>, StoreError> {
        Ok(sqlx::query_as("SELECT id, display_name FROM users")
            .fetch_all(&self.pool)
            .await?)
    }

    // ── Auth sessions ────────────────────────────────────────────────────────

    pub async fn insert_auth_session(
        &self,
        user_id: &str,
        token: &str,
        ttl_secs: i64,
    ) -> Result<AuthSessionRow, StoreError> {
        let now = Utc::now();
        let expires = now + Duration::seconds(ttl_secs);
        sqlx::query(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(now)
        .bind(expires)
        .execute(&self.pool)
        .await?;

        Ok(AuthSessionRow {
            token: token.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: expires,
        })
    }

    pub async fn auth_session_by_token(
        &self,
        token: &str,
    ) -> Result<Option<AuthSessionRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, AuthSessionRow>("SELECT * FROM auth_sessions WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn delete_auth_session(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drop sessions that expired before `now`. Returns how many were removed.
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
