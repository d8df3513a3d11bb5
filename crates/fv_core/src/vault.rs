//! The encrypted credential vault.
//!
//! All entry operations require the vault session to be unlocked with the
//! account's master passphrase. Unlocking checks the candidate passphrase
//! against the stored verifier before any entry is touched, so a typo can
//! never silently decrypt entries into garbage. The passphrase itself is
//! never persisted; on lock/logout only re-entry restores access.

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

use fv_crypto::kdf::derive_vault_key;
use fv_crypto::CryptoError;
use fv_store::db::decode_nonce;
use fv_store::entries::{EncryptedSecret, NewVaultEntry};
use fv_store::models::VaultEntryRow;
use fv_store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Wrong master passphrase")]
    WrongPassphrase,

    #[error("Vault is locked — enter the master passphrase first")]
    Locked,

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Crypto(CryptoError),
}

impl From<StoreError> for VaultError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VaultLocked => VaultError::Locked,
            StoreError::Crypto(CryptoError::Decrypt) => VaultError::WrongPassphrase,
            other => VaultError::Store(other),
        }
    }
}

impl From<CryptoError> for VaultError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Decrypt => VaultError::WrongPassphrase,
            other => VaultError::Crypto(other),
        }
    }
}

/// Input for creating or rewriting an entry. The secret arrives in
/// plaintext and is encrypted before anything is written.
pub struct EntryInput {
    pub title: String,
    pub site_url: Option<String>,
    pub username: String,
    pub secret: String,
    pub notes: Option<String>,
}

/// A decrypted entry, returned only from [`VaultService::reveal_entry`].
#[derive(Debug)]
pub struct RevealedEntry {
    pub entry: VaultEntryRow,
    pub secret: Zeroizing<String>,
    pub notes: Option<Zeroizing<String>>,
}

#[derive(Clone)]
pub struct VaultService {
    store: Store,
}

impl VaultService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Unlock the vault for this session.
    ///
    /// First unlock of an account writes the passphrase verifier; every
    /// later unlock must decrypt it back to the marker, otherwise the
    /// candidate passphrase is rejected before any entry operation.
    pub async fn unlock(&self, user_id: &str, passphrase: &str) -> Result<(), VaultError> {
        let user = self.store.user_by_id(user_id).await?;
        let salt = decode_salt(&user.vault_salt)?;
        let key = derive_vault_key(passphrase.as_bytes(), &salt)?;

        match (&user.vault_verifier, &user.vault_verifier_nonce) {
            (Some(verifier_b64), Some(nonce_hex)) => {
                let verifier = general_purpose::URL_SAFE_NO_PAD
                    .decode(verifier_b64)
                    .map_err(CryptoError::Base64Decode)?;
                let nonce = decode_nonce(nonce_hex)?;
                if !fv_crypto::cipher::verify_key(&key, &verifier, &nonce) {
                    return Err(VaultError::WrongPassphrase);
                }
            }
            _ => {
                let (verifier, nonce) = fv_crypto::cipher::create_verifier(&key)?;
                self.store
                    .set_vault_verifier(
                        user_id,
                        &general_purpose::URL_SAFE_NO_PAD.encode(verifier),
                        &hex::encode(nonce),
                    )
                    .await?;
                info!(user_id, "vault initialised");
            }
        }

        self.store.session.unlock_with_key(key).await?;
        Ok(())
    }

    pub async fn lock(&self) {
        self.store.session.lock().await;
    }

    pub async fn is_locked(&self) -> bool {
        self.store.session.is_locked().await
    }

    /// Lock automatically after this many idle seconds. 0 disables the
    /// timer. Applies to the currently unlocked session.
    pub async fn set_auto_lock_timeout(&self, seconds: u64) {
        self.store.session.set_auto_lock_timeout(seconds).await;
    }

    /// Check a candidate passphrase against the stored verifier without
    /// touching the session (used before bulk operations).
    pub async fn verify_passphrase(
        &self,
        user_id: &str,
        passphrase: &str,
    ) -> Result<bool, VaultError> {
        let user = self.store.user_by_id(user_id).await?;
        let (verifier_b64, nonce_hex) = match (&user.vault_verifier, &user.vault_verifier_nonce) {
            (Some(v), Some(n)) => (v, n),
            _ => return Ok(false), // vault never initialised
        };
        let salt = decode_salt(&user.vault_salt)?;
        let key = derive_vault_key(passphrase.as_bytes(), &salt)?;
        let verifier = general_purpose::URL_SAFE_NO_PAD
            .decode(verifier_b64)
            .map_err(CryptoError::Base64Decode)?;
        let nonce = decode_nonce(nonce_hex)?;
        Ok(fv_crypto::cipher::verify_key(&key, &verifier, &nonce))
    }

    pub async fn add_entry(
        &self,
        user_id: &str,
        input: EntryInput,
    ) -> Result<VaultEntryRow, VaultError> {
        let new = self.encrypt_input(input).await?;
        let row = self.store.insert_vault_entry(user_id, new).await?;
        info!(user_id, entry_id = %row.id, "vault entry created");
        Ok(row)
    }

    /// Re-encrypts the secret with a fresh nonce under the session key.
    pub async fn update_entry(
        &self,
        user_id: &str,
        entry_id: &str,
        input: EntryInput,
    ) -> Result<VaultEntryRow, VaultError> {
        let new = self.encrypt_input(input).await?;
        Ok(self.store.update_vault_entry(user_id, entry_id, new).await?)
    }

    /// Entry metadata only; nothing is decrypted.
    pub async fn list_entries(&self, user_id: &str) -> Result<Vec<VaultEntryRow>, VaultError> {
        Ok(self.store.vault_entries_for_user(user_id).await?)
    }

    /// Decrypt one entry. A wrong session passphrase (or tampered row)
    /// surfaces as [`VaultError::WrongPassphrase`], never as garbage.
    pub async fn reveal_entry(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<RevealedEntry, VaultError> {
        let entry = self.store.vault_entry(user_id, entry_id).await?;

        let secret = self
            .store
            .decrypt_value(&entry.secret_enc, &entry.secret_nonce)
            .await?;
        let secret = Zeroizing::new(
            String::from_utf8(secret.to_vec()).map_err(|_| VaultError::WrongPassphrase)?,
        );

        let notes = match (&entry.notes_enc, &entry.notes_nonce) {
            (Some(ct), Some(nonce)) => {
                let plaintext = self.store.decrypt_value(ct, nonce).await?;
                Some(Zeroizing::new(
                    String::from_utf8(plaintext.to_vec())
                        .map_err(|_| VaultError::WrongPassphrase)?,
                ))
            }
            _ => None,
        };

        Ok(RevealedEntry { entry, secret, notes })
    }

    pub async fn delete_entry(&self, user_id: &str, entry_id: &str) -> Result<(), VaultError> {
        self.store.delete_vault_entry(user_id, entry_id).await?;
        info!(user_id, entry_id, "vault entry deleted");
        Ok(())
    }

    async fn encrypt_input(&self, input: EntryInput) -> Result<NewVaultEntry, VaultError> {
        let strength_score = fv_crypto::strength::score(&input.secret);

        let (ciphertext_b64, nonce_hex) =
            self.store.encrypt_value(input.secret.as_bytes()).await?;
        let secret = EncryptedSecret { ciphertext_b64, nonce_hex };

        let notes = match &input.notes {
            Some(text) => {
                let (ciphertext_b64, nonce_hex) =
                    self.store.encrypt_value(text.as_bytes()).await?;
                Some(EncryptedSecret { ciphertext_b64, nonce_hex })
            }
            None => None,
        };

        Ok(NewVaultEntry {
            title: input.title,
            site_url: input.site_url,
            username: input.username,
            secret,
            strength_score,
            notes,
        })
    }
}

fn decode_salt(salt_hex: &str) -> Result<[u8; 16], VaultError> {
    let bytes = hex::decode(salt_hex).map_err(CryptoError::HexDecode)?;
    bytes
        .try_into()
        .map_err(|_| VaultError::Crypto(CryptoError::InvalidKey("vault salt is not 16 bytes".into())))
}
