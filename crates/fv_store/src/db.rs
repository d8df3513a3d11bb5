//! Database abstraction over SQLite via sqlx.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;
use zeroize::Zeroizing;

use crate::error::StoreError;
use crate::session::VaultSession;

/// Central store handle. Cheap to clone (Arc internally).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
    pub session: VaultSession,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here — NOT inside a migration, because SQLite forbids
    /// changing `journal_mode` inside a transaction and sqlx wraps every
    /// migration in one.
    pub async fn open(db_path: &Path, session: VaultSession) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        crate::migrations::run(&pool).await?;
        tracing::debug!(path = %db_path.display(), "database opened");

        Ok(Self { pool, session })
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    /// Encrypt a plaintext value with the unlocked vault key.
    /// Returns (base64 ciphertext, hex nonce); store and fetch them together.
    pub async fn encrypt_value(&self, plaintext: &[u8]) -> Result<(String, String), StoreError> {
        self.session
            .with_key(|key| {
                let (ct, nonce) = fv_crypto::encrypt(key, plaintext).map_err(StoreError::Crypto)?;
                Ok((
                    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, ct),
                    hex::encode(nonce),
                ))
            })
            .await
    }

    /// Decrypt a vault-encrypted value given its ciphertext and nonce columns.
    pub async fn decrypt_value(
        &self,
        ct_b64: &str,
        nonce_hex: &str,
    ) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        let ct = base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, ct_b64)
            .map_err(|e| StoreError::Crypto(fv_crypto::CryptoError::Base64Decode(e)))?;
        let nonce = decode_nonce(nonce_hex)?;

        self.session
            .with_key(|key| fv_crypto::decrypt(key, &ct, &nonce).map_err(StoreError::Crypto))
            .await
    }
}

/// Decode a hex nonce column into the fixed 24-byte array the cipher needs.
pub fn decode_nonce(nonce_hex: &str) -> Result<[u8; 24], StoreError> {
    let bytes = hex::decode(nonce_hex)
        .map_err(|e| StoreError::Crypto(fv_crypto::CryptoError::HexDecode(e)))?;
    bytes.try_into().map_err(|_| {
        StoreError::Crypto(fv_crypto::CryptoError::InvalidKey(
            "nonce column is not 24 bytes".into(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::session::VaultSession;
    use fv_crypto::kdf::generate_salt;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("fv.db"), VaultSession::new())
            .await
            .expect("open store");

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&store.pool)
                .await
                .expect("users table exists");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn encrypt_decrypt_value_roundtrip() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("fv.db"), VaultSession::new())
            .await
            .unwrap();

        let salt = generate_salt();
        store.session.unlock(b"correct-horse", &salt).await.unwrap();

        let (ct, nonce) = store.encrypt_value(b"hunter2").await.unwrap();
        let pt = store.decrypt_value(&ct, &nonce).await.unwrap();
        assert_eq!(pt.as_slice(), b"hunter2");
    }

    #[tokio::test]
    async fn encrypt_fails_when_locked() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("fv.db"), VaultSession::new())
            .await
            .unwrap();
        assert!(store.encrypt_value(b"hunter2").await.is_err());
    }
}
