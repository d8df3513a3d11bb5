//! Password strength scoring and generation.
//!
//! Scoring delegates to zxcvbn; the 0–4 scale is stored with each vault
//! entry so weak credentials can be filtered without decrypting anything.

use rand::RngCore;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+[]{}|;:,.<>?";

/// zxcvbn strength score, 0 (guessable) to 4 (very strong).
pub fn score(password: &str) -> u8 {
    match zxcvbn::zxcvbn(password, &[]).score() {
        zxcvbn::Score::Zero => 0,
        zxcvbn::Score::One => 1,
        zxcvbn::Score::Two => 2,
        zxcvbn::Score::Three => 3,
        _ => 4,
    }
}

pub fn label(score: u8) -> &'static str {
    match score {
        0 => "Very Weak",
        1 => "Weak",
        2 => "Moderate",
        3 => "Strong",
        4 => "Very Strong",
        _ => "Unknown",
    }
}

/// Generate a random password with at least one character from each
/// enabled class. Minimum length 8.
pub fn generate_password(length: usize, include_symbols: bool) -> String {
    let length = length.max(8);
    let mut pool = Vec::with_capacity(96);
    pool.extend_from_slice(UPPERCASE);
    pool.extend_from_slice(LOWERCASE);
    pool.extend_from_slice(DIGITS);
    if include_symbols {
        pool.extend_from_slice(SYMBOLS);
    }

    let mut rng = rand::rngs::OsRng;
    let mut out = Vec::with_capacity(length);

    // One character from each required class first, the rest from the pool,
    // then shuffle so class characters do not cluster at the front.
    let mut groups: Vec<&[u8]> = vec![UPPERCASE, LOWERCASE, DIGITS];
    if include_symbols {
        groups.push(SYMBOLS);
    }
    for group in &groups {
        out.push(group[(rng.next_u32() as usize) % group.len()]);
    }
    while out.len() < length {
        out.push(pool[(rng.next_u32() as usize) % pool.len()]);
    }
    for i in (1..out.len()).rev() {
        let j = (rng.next_u32() as usize) % (i + 1);
        out.swap(i, j);
    }

    out.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_monotonic_for_obvious_cases() {
        assert!(score("password") <= 1);
        assert!(score("xK9#mQ2$vL8@wP5z") >= 3);
    }

    #[test]
    fn generated_password_has_all_classes() {
        for _ in 0..20 {
            let pw = generate_password(16, true);
            assert_eq!(pw.len(), 16);
            assert!(pw.bytes().any(|b| b.is_ascii_uppercase()));
            assert!(pw.bytes().any(|b| b.is_ascii_lowercase()));
            assert!(pw.bytes().any(|b| b.is_ascii_digit()));
            assert!(pw.bytes().any(|b| SYMBOLS.contains(&b)));
        }
    }

    #[test]
    fn short_lengths_are_clamped() {
        assert_eq!(generate_password(3, false).len(), 8);
    }
}
