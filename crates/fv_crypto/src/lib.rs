//! fv_crypto — Cryptographic primitives for Flagvault
//!
//! # Vault encryption strategy
//! Vault entries are encrypted client-side, per entry:
//! - The master passphrase is stretched into a 32-byte key via Argon2id
//!   with a per-user salt (the salt is stored alongside the profile, not
//!   secret).
//! - Each encrypt call draws a fresh random 24-byte nonce; ciphertext and
//!   nonce must be stored together and presented together to decrypt.
//! - XChaCha20-Poly1305 authenticates the ciphertext, so a wrong passphrase
//!   or tampered record fails the tag check and surfaces a typed
//!   [`CryptoError::Decrypt`] instead of garbage plaintext.

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod strength;
pub mod totp;

pub use cipher::{decrypt, encrypt};
pub use error::CryptoError;
pub use kdf::VaultKey;
