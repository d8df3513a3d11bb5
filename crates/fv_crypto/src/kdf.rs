//! Key derivation.
//!
//! `derive_vault_key` — Argon2id, derives the 32-byte key that encrypts a
//! user's vault entries. The passphrase is never used as the cipher key
//! directly; stretching means key strength no longer equals raw passphrase
//! strength.

use argon2::{Argon2, Params, Version};
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// 32-byte vault key derived from the master passphrase. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct VaultKey(pub [u8; 32]);

impl VaultKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Argon2id parameters — tuned for interactive use.
fn argon2_params() -> Result<Params, CryptoError> {
    Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 iterations
        1,         // p_cost: 1 thread
        Some(32),  // output len
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

/// Derive a vault key from the master passphrase + 16-byte salt.
/// The salt is stored with the user profile (not secret).
pub fn derive_vault_key(passphrase: &[u8], salt: &[u8; 16]) -> Result<VaultKey, CryptoError> {
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params()?);
    let mut output = [0u8; 32];
    argon2
        .hash_password_into(passphrase, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(VaultKey(output))
}

/// Generate a fresh random 16-byte salt (call once per account; store in DB).
pub fn generate_salt() -> [u8; 16] {
    use rand::RngCore;
    let mut salt = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
