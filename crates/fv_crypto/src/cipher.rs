//! Vault entry encryption.
//!
//! XChaCha20-Poly1305 (192-bit nonce). Key: 32 bytes. Nonce: 24 bytes,
//! random per call. Tag: 16 bytes, appended to the ciphertext.
//!
//! The nonce is returned separately and must be stored alongside the
//! ciphertext; both are required to decrypt. Nonces are never reused,
//! even for the same key and plaintext.

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    XChaCha20Poly1305,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::kdf::VaultKey;

/// Marker plaintext encrypted once at vault setup; decrypting it back out
/// proves a candidate passphrase matches the one used for prior entries.
pub const VERIFIER_MARKER: &[u8] = b"VALID";

/// Encrypt `plaintext`, returning (ciphertext+tag, fresh random nonce).
pub fn encrypt(key: &VaultKey, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; 24]), CryptoError> {
    let cipher =
        XChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::Encrypt)?;

    let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Encrypt)?;

    Ok((ciphertext, nonce.into()))
}

/// Decrypt `ciphertext` with the nonce it was produced with.
/// Fails with [`CryptoError::Decrypt`] on a wrong key or tampered data.
pub fn decrypt(
    key: &VaultKey,
    ciphertext: &[u8],
    nonce: &[u8; 24],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let cipher =
        XChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::Decrypt)?;

    let nonce = chacha20poly1305::XNonce::from_slice(nonce);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Decrypt)?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt the verifier marker with a freshly derived key (vault setup).
pub fn create_verifier(key: &VaultKey) -> Result<(Vec<u8>, [u8; 24]), CryptoError> {
    encrypt(key, VERIFIER_MARKER)
}

/// True iff `key` decrypts the stored verifier back to the marker.
pub fn verify_key(key: &VaultKey, verifier: &[u8], nonce: &[u8; 24]) -> bool {
    match decrypt(key, verifier, nonce) {
        Ok(plaintext) => plaintext.as_slice() == VERIFIER_MARKER,
        Err(_) => false,
    }
}
