//! Database row models — these map to/from SQL rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Challenge difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    /// Argon2id PHC-format hash of the login password.
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub two_factor_enabled: bool,
    /// Hex TOTP shared secret (null until 2FA is set up).
    pub totp_secret: Option<String>,
    /// Hex-encoded 16-byte Argon2id salt for vault key derivation.
    pub vault_salt: String,
    /// Base64 passphrase verifier ciphertext (null until first vault unlock).
    pub vault_verifier: Option<String>,
    /// Hex 24-byte nonce belonging to the verifier ciphertext.
    pub vault_verifier_nonce: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthSessionRow {
    /// Random 32-byte token, base64.
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VaultEntryRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub site_url: Option<String>,
    pub username: String,
    /// Base64 XChaCha20-Poly1305 ciphertext of the stored secret.
    pub secret_enc: String,
    /// Hex 24-byte nonce produced with `secret_enc`; required to decrypt it.
    pub secret_nonce: String,
    /// zxcvbn strength score, 0–4.
    pub strength_score: i64,
    /// Base64 ciphertext of the notes (null when no notes).
    pub notes_enc: Option<String>,
    pub notes_nonce: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChallengeRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String, // "web" / "crypto" / "forensics" / ...
    pub difficulty: String, // Difficulty as string
    pub points: i64,
    /// Solution flag. Never returned by listing queries.
    pub flag: String,
    pub is_active: bool,
    /// JSON array of hint strings, in reveal order (null when none).
    pub hints: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ChallengeRow {
    pub fn difficulty(&self) -> Option<Difficulty> {
        Difficulty::parse(&self.difficulty)
    }

    pub fn hint_list(&self) -> Result<Vec<String>, serde_json::Error> {
        match &self.hints {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: String,
    pub user_id: String,
    pub challenge_id: String,
    pub submitted_flag: String,
    pub is_correct: bool,
    pub submitted_at: DateTime<Utc>,
}
