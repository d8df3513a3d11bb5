//! Time-based one-time passwords (RFC 6238).
//!
//! HMAC-SHA1, 6 digits, 30-second step. Verification accepts one step of
//! clock skew in either direction.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CryptoError;

type HmacSha1 = Hmac<Sha1>;

pub const TOTP_DIGITS: u32 = 6;
pub const TOTP_STEP_SECS: u64 = 30;
const SECRET_LEN: usize = 20;

/// Generate a fresh shared secret, hex-encoded for storage and enrollment.
pub fn generate_secret() -> String {
    use rand::RngCore;
    let mut secret = [0u8; SECRET_LEN];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    hex::encode(secret)
}

/// Compute the code for an explicit unix timestamp.
pub fn code_at(secret_hex: &str, unix_secs: u64) -> Result<String, CryptoError> {
    let secret = hex::decode(secret_hex)?;
    if secret.is_empty() {
        return Err(CryptoError::InvalidTotpSecret("empty secret".into()));
    }
    let counter = unix_secs / TOTP_STEP_SECS;

    let mut mac = HmacSha1::new_from_slice(&secret)
        .map_err(|e| CryptoError::InvalidTotpSecret(e.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation (RFC 4226 §5.3).
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = binary % 10u32.pow(TOTP_DIGITS);
    Ok(format!("{code:0width$}", width = TOTP_DIGITS as usize))
}

/// Compute the current code.
pub fn current_code(secret_hex: &str) -> Result<String, CryptoError> {
    code_at(secret_hex, now_unix())
}

/// Verify a candidate code against the current step ±1 (clock skew).
pub fn verify(secret_hex: &str, candidate: &str) -> Result<bool, CryptoError> {
    let now = now_unix();
    for skew in [-1i64, 0, 1] {
        let ts = now.saturating_add_signed(skew * TOTP_STEP_SECS as i64);
        if code_at(secret_hex, ts)? == candidate {
            return Ok(true);
        }
    }
    Ok(false)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 Appendix B test vector (SHA-1 mode, secret "12345678901234567890"),
    // truncated from 8 digits to our 6.
    const RFC_SECRET_HEX: &str = "3132333435363738393031323334353637383930";

    #[test]
    fn rfc6238_vectors() {
        assert_eq!(code_at(RFC_SECRET_HEX, 59).unwrap(), "287082");
        assert_eq!(code_at(RFC_SECRET_HEX, 1111111109).unwrap(), "081804");
        assert_eq!(code_at(RFC_SECRET_HEX, 20000000000).unwrap(), "353130");
    }

    #[test]
    fn verify_accepts_current_and_adjacent_steps() {
        let secret = generate_secret();
        let code = current_code(&secret).unwrap();
        assert!(verify(&secret, &code).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_code() {
        let secret = generate_secret();
        let code = current_code(&secret).unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(!verify(&secret, wrong).unwrap());
    }

    #[test]
    fn bad_secret_is_typed_error() {
        assert!(code_at("not-hex", 59).is_err());
    }
}
