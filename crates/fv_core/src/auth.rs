//! Accounts and auth sessions.
//!
//! Login passwords are hashed with Argon2id (PHC string) — unrelated to the
//! vault master passphrase, which never touches the users table. Sessions
//! are random bearer tokens with an expiry; signing out deletes the session
//! row and locks the in-memory vault session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use thiserror::Error;
use tracing::{info, warn};

use fv_store::models::UserRow;
use fv_store::users::NewUser;
use fv_store::{Store, StoreError};

/// Default auth-session lifetime.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// How long a password-verified sign-in may wait for its TOTP code.
pub const TWO_FACTOR_PENDING_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This email is already registered")]
    AlreadyRegistered,

    #[error("Session expired — sign in again")]
    SessionExpired,

    #[error("Unknown session token")]
    SessionInvalid,

    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,

    #[error("Two-factor authentication is not set up for this account")]
    TwoFactorNotConfigured,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] fv_crypto::CryptoError),
}

/// Outcome of a sign-in attempt.
#[derive(Debug)]
pub enum SignIn {
    /// Credentials accepted, session issued.
    Complete { user: UserRow, token: String },
    /// Credentials accepted but the account requires a TOTP code; no
    /// session is issued until [`Auth::verify_two_factor`] is called with
    /// this pending token, which proves the password factor was checked.
    NeedsTwoFactor { pending_token: String },
}

/// A password-verified sign-in waiting on its second factor.
struct PendingTwoFactor {
    user_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Auth {
    store: Store,
    pending_two_factor: Arc<Mutex<HashMap<String, PendingTwoFactor>>>,
}

impl Auth {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            pending_two_factor: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a new account. The vault salt is fixed at registration;
    /// the passphrase verifier is written on the first vault unlock.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserRow, AuthError> {
        if self.store.user_by_email(email).await?.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash,
                display_name: display_name.map(str::to_string),
                vault_salt_hex: hex::encode(fv_crypto::kdf::generate_salt()),
            })
            .await?;
        info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    /// Verify credentials. Issues a session unless the account has 2FA
    /// enabled, in which case a pending token is returned and the caller
    /// must follow up with [`Auth::verify_two_factor`].
    ///
    /// Sessions that expired while nobody was looking are swept here.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, AuthError> {
        self.store.delete_expired_sessions(Utc::now()).await?;

        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        if user.two_factor_enabled {
            let pending_token = random_token();
            self.pending(|map| {
                map.insert(
                    pending_token.clone(),
                    PendingTwoFactor {
                        user_id: user.id.clone(),
                        expires_at: Utc::now() + Duration::seconds(TWO_FACTOR_PENDING_TTL_SECS),
                    },
                );
            });
            return Ok(SignIn::NeedsTwoFactor { pending_token });
        }

        let token = self.issue_session(&user.id).await?;
        Ok(SignIn::Complete { user, token })
    }

    /// Complete a 2FA sign-in: the pending token proves the password was
    /// already verified, the TOTP code proves the second factor. Only then
    /// is a session issued. The pending token is consumed on success or
    /// expiry; a wrong code leaves it usable for another try.
    pub async fn verify_two_factor(
        &self,
        pending_token: &str,
        code: &str,
    ) -> Result<SignIn, AuthError> {
        let (user_id, expires_at) = self
            .pending(|map| {
                map.get(pending_token)
                    .map(|p| (p.user_id.clone(), p.expires_at))
            })
            .ok_or(AuthError::SessionInvalid)?;

        if expires_at < Utc::now() {
            self.pending(|map| {
                map.remove(pending_token);
            });
            return Err(AuthError::SessionExpired);
        }

        let user = self.store.user_by_id(&user_id).await?;
        let secret = user
            .totp_secret
            .as_deref()
            .ok_or(AuthError::TwoFactorNotConfigured)?;

        if !fv_crypto::totp::verify(secret, code)? {
            warn!(user_id = %user.id, "rejected two-factor code");
            return Err(AuthError::InvalidTwoFactorCode);
        }

        self.pending(|map| {
            map.remove(pending_token);
        });
        let token = self.issue_session(&user.id).await?;
        Ok(SignIn::Complete { user, token })
    }

    /// Resolve a bearer token to its user. Expired sessions are deleted on
    /// sight and reported as such.
    pub async fn authenticate(&self, token: &str) -> Result<UserRow, AuthError> {
        let session = self
            .store
            .auth_session_by_token(token)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.expires_at < chrono::Utc::now() {
            self.store.delete_auth_session(token).await?;
            return Err(AuthError::SessionExpired);
        }

        Ok(self.store.user_by_id(&session.user_id).await?)
    }

    /// Delete the session and lock the vault: the master passphrase must be
    /// re-entered on next login.
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        self.store.delete_auth_session(token).await?;
        self.store.session.lock().await;
        Ok(())
    }

    /// Begin 2FA enrollment: store a fresh secret, disabled until the user
    /// proves possession with [`Auth::confirm_two_factor`]. Returns the hex
    /// secret for the authenticator app.
    pub async fn setup_two_factor(&self, user_id: &str) -> Result<String, AuthError> {
        let secret = fv_crypto::totp::generate_secret();
        self.store
            .set_two_factor(user_id, false, Some(&secret))
            .await?;
        Ok(secret)
    }

    /// Finish enrollment by verifying one code from the new secret.
    pub async fn confirm_two_factor(&self, user_id: &str, code: &str) -> Result<(), AuthError> {
        let user = self.store.user_by_id(user_id).await?;
        let secret = user
            .totp_secret
            .as_deref()
            .ok_or(AuthError::TwoFactorNotConfigured)?;
        if !fv_crypto::totp::verify(secret, code)? {
            return Err(AuthError::InvalidTwoFactorCode);
        }
        self.store.set_two_factor(user_id, true, Some(secret)).await?;
        info!(user_id, "two-factor enabled");
        Ok(())
    }

    pub async fn disable_two_factor(&self, user_id: &str) -> Result<(), AuthError> {
        self.store.set_two_factor(user_id, false, None).await?;
        Ok(())
    }

    /// Change the login password (reset flow). Does not touch the vault
    /// passphrase or any encrypted entry.
    pub async fn update_password(&self, user_id: &str, new_password: &str) -> Result<(), AuthError> {
        let password_hash = hash_password(new_password)?;
        self.store.update_password_hash(user_id, &password_hash).await?;
        Ok(())
    }

    async fn issue_session(&self, user_id: &str) -> Result<String, AuthError> {
        let token = random_token();
        self.store
            .insert_auth_session(user_id, &token, SESSION_TTL_SECS)
            .await?;
        Ok(token)
    }

    /// Run a closure against the pending-2FA map. The lock is held only for
    /// the closure; a poisoned lock just yields the map as-is.
    fn pending<R>(&self, f: impl FnOnce(&mut HashMap<String, PendingTwoFactor>) -> R) -> R {
        let mut map = self
            .pending_two_factor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut map)
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .to_string())
}

fn verify_password(password: &str, phc: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(phc).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}
