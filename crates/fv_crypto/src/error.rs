use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed (wrong passphrase or corrupted data)")]
    Decrypt,

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Invalid TOTP secret: {0}")]
    InvalidTotpSecret(String),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
