//! Vault entry queries. Every query is scoped by the owning user id.

use chrono::Utc;
use uuid::Uuid;

use crate::db::Store;
use crate::error::StoreError;
use crate::models::VaultEntryRow;

/// Ciphertext columns for one entry, produced together by one encrypt call.
pub struct EncryptedSecret {
    pub ciphertext_b64: String,
    pub nonce_hex: String,
}

pub struct NewVaultEntry {
    pub title: String,
    pub site_url: Option<String>,
    pub username: String,
    pub secret: EncryptedSecret,
    pub strength_score: u8,
    pub notes: Option<EncryptedSecret>,
}

impl Store {
    pub async fn insert_vault_entry(
        &self,
        user_id: &str,
        new: NewVaultEntry,
    ) -> Result<VaultEntryRow, StoreError> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let (notes_enc, notes_nonce) = match &new.notes {
            Some(n) => (Some(n.ciphertext_b64.clone()), Some(n.nonce_hex.clone())),
            None => (None, None),
        };
        sqlx::query(
            "INSERT INTO vault_entries (id, user_id, title, site_url, username, secret_enc, secret_nonce, strength_score, notes_enc, notes_nonce, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&new.title)
        .bind(&new.site_url)
        .bind(&new.username)
        .bind(&new.secret.ciphertext_b64)
        .bind(&new.secret.nonce_hex)
        .bind(new.strength_score as i64)
        .bind(&notes_enc)
        .bind(&notes_nonce)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.vault_entry(user_id, &id).await
    }

    /// Replace an entry's contents. Re-encrypted columns are written as a
    /// pair; an update never mixes a new nonce with old ciphertext.
    pub async fn update_vault_entry(
        &self,
        user_id: &str,
        entry_id: &str,
        new: NewVaultEntry,
    ) -> Result<VaultEntryRow, StoreError> {
        let (notes_enc, notes_nonce) = match &new.notes {
            Some(n) => (Some(n.ciphertext_b64.clone()), Some(n.nonce_hex.clone())),
            None => (None, None),
        };
        let result = sqlx::query(
            "UPDATE vault_entries SET title = ?, site_url = ?, username = ?, secret_enc = ?, secret_nonce = ?, strength_score = ?, notes_enc = ?, notes_nonce = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(&new.title)
        .bind(&new.site_url)
        .bind(&new.username)
        .bind(&new.secret.ciphertext_b64)
        .bind(&new.secret.nonce_hex)
        .bind(new.strength_score as i64)
        .bind(&notes_enc)
        .bind(&notes_nonce)
        .bind(Utc::now())
        .bind(entry_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("vault entry {entry_id}")));
        }
        self.vault_entry(user_id, entry_id).await
    }

    pub async fn vault_entry(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<VaultEntryRow, StoreError> {
        sqlx::query_as::<_, VaultEntryRow>(
            "SELECT * FROM vault_entries WHERE id = ? AND user_id = ?",
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("vault entry {entry_id}")))
    }

    pub async fn vault_entries_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<VaultEntryRow>, StoreError> {
        Ok(sqlx::query_as::<_, VaultEntryRow>(
            "SELECT * FROM vault_entries WHERE user_id = ? ORDER BY title",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn delete_vault_entry(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM vault_entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("vault entry {entry_id}")));
        }
        Ok(())
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

    fn entry(title: &str) -> NewVaultEntry {
        NewVaultEntry {
            title: title.into(),
            site_url: Some("https://example.com".into()),
            username: "alice".into(),
            secret: EncryptedSecret {
                ciphertext_b64: "Y2lwaGVydGV4dA".into(),
                nonce_hex: "00".repeat(24),
            },
            strength_score: 3,
            notes: None,
        }
    }

    #[tokio::test]
    async fn crud_roundtrip() {
        let (_dir, store, user_id) = store_with_user().await;

        let created = store.insert_vault_entry(&user_id, entry("GitHub")).await.unwrap();
        assert_eq!(created.strength_score, 3);

        let listed = store.vault_entries_for_user(&user_id).await.unwrap();
        assert_eq!(listed.len(), 1);

        let mut updated = entry("GitHub (work)");
        updated.strength_score = 4;
        let row = store
            .update_vault_entry(&user_id, &created.id, updated)
            .await
            .unwrap();
        assert_eq!(row.title, "GitHub (work)");
        assert_eq!(row.strength_score, 4);

        store.delete_vault_entry(&user_id, &created.id).await.unwrap();
        assert!(store.vault_entries_for_user(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_are_ownership_scoped() {
        let (_dir, store, user_id) = store_with_user().await;
        let other = store
            .insert_user(NewUser {
                email: "b@example.com".into(),
                password_hash: "$argon2id$stub".into(),
                display_name: None,
                vault_salt_hex: hex::encode(fv_crypto::kdf::generate_salt()),
            })
            .await
            .unwrap();

        let created = store.insert_vault_entry(&user_id, entry("GitHub")).await.unwrap();

        // A different user cannot read, rewrite, or delete the row by id.
        assert!(store.vault_entry(&other.id, &created.id).await.is_err());
        assert!(store
            .update_vault_entry(&other.id, &created.id, entry("stolen"))
            .await
            .is_err());
        assert!(store.delete_vault_entry(&other.id, &created.id).await.is_err());
        assert!(store.vault_entry(&user_id, &created.id).await.is_ok());
    }
}
