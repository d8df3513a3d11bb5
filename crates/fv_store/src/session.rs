//! Vault session: in-memory key material unlocked by the master passphrase.
//!
//! The session holds the derived 32-byte vault key in memory only. On lock
//! (explicit, logout, or auto-lock after inactivity) the key is zeroized;
//! nothing about the passphrase is ever persisted. A locked session refuses
//! every encrypt/decrypt operation until the passphrase is re-entered.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use fv_crypto::kdf::derive_vault_key;
use fv_crypto::VaultKey;

use crate::error::StoreError;

const DEFAULT_AUTO_LOCK_SECS: u64 = 1800; // 30 minutes

struct SessionInner {
    key: VaultKey,
    last_activity: Instant,
    auto_lock_secs: u64,
}

/// Thread-safe vault session handle. Clone to share across tasks.
#[derive(Clone)]
pub struct VaultSession {
    inner: Arc<RwLock<Option<SessionInner>>>,
}

impl VaultSession {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Unlock with the master passphrase and the account's stored salt.
    /// Call on first vault interaction of the browsing session.
    pub async fn unlock(&self, passphrase: &[u8], salt: &[u8; 16]) -> Result<(), StoreError> {
        let key = derive_vault_key(passphrase, salt)?;
        self.unlock_with_key(key).await
    }

    /// Unlock with an already-derived key.
    pub async fn unlock_with_key(&self, key: VaultKey) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        *guard = Some(SessionInner {
            key,
            last_activity: Instant::now(),
            auto_lock_secs: DEFAULT_AUTO_LOCK_SECS,
        });
        Ok(())
    }

    /// Lock the session — zeroizes the key.
    pub async fn lock(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }

    pub async fn is_locked(&self) -> bool {
        let guard = self.inner.read().await;
        match guard.as_ref() {
            Some(inner) => {
                if inner.auto_lock_secs > 0
                    && inner.last_activity.elapsed() > Duration::from_secs(inner.auto_lock_secs)
                {
                    drop(guard);
                    self.lock().await;
                    return true;
                }
                false
            }
            None => true,
        }
    }

    /// Set the auto-lock timeout in seconds. 0 disables auto-lock.
    pub async fn set_auto_lock_timeout(&self, seconds: u64) {
        let mut guard = self.inner.write().await;
        if let Some(ref mut inner) = *guard {
            inner.auto_lock_secs = seconds;
        }
    }

    /// Record activity (resets the auto-lock timer).
    pub async fn touch(&self) {
        let mut guard = self.inner.write().await;
        if let Some(ref mut inner) = *guard {
            inner.last_activity = Instant::now();
        }
    }

    /// Run an encrypt/decrypt operation against the unlocked key.
    /// Returns `StoreError::VaultLocked` when locked or auto-lock expired.
    /// Touches the activity timer.
    pub async fn with_key<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&VaultKey) -> Result<R, StoreError>,
    {
        if self.is_locked().await {
            return Err(StoreError::VaultLocked);
        }

        let mut guard = self.inner.write().await;
        match guard.as_mut() {
            Some(inner) => {
                inner.last_activity = Instant::now();
                f(&inner.key)
            }
            None => Err(StoreError::VaultLocked),
        }
    }
}

impl Default for VaultSession {
    fn default() -> Self {
        Self::new()
    }
}
