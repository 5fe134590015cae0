//! Password policy and one-way hashing.
//!
//! The strength check runs server-side on every registration; any client-side
//! copy of it is advisory only. Hashes are salted Argon2id PHC strings, so the
//! salt and parameters travel with the digest.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use std::fmt;

/// Minimum number of characters accepted.
pub const MIN_LENGTH: usize = 8;

/// The fixed special-character set; at least one must be present.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// PasswordWeakness
///
/// The first criterion a rejected password failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordWeakness {
    Missing,
    TooShort,
    NoUppercase,
    NoLowercase,
    NoDigit,
    NoSpecialCharacter,
}

impl PasswordWeakness {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Missing => "Password is required",
            Self::TooShort => "Password must be at least 8 characters long",
            Self::NoUppercase => "Password must contain at least one uppercase letter",
            Self::NoLowercase => "Password must contain at least one lowercase letter",
            Self::NoDigit => "Password must contain at least one number",
            Self::NoSpecialCharacter => {
                "Password must contain at least one special character (!@#$%^&*(),.?\":{}|<>)"
            }
        }
    }
}

impl fmt::Display for PasswordWeakness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// validate_strength
///
/// Accepts a password only if it is present, at least [`MIN_LENGTH`] characters,
/// and contains an ASCII uppercase letter, an ASCII lowercase letter, a digit and
/// one of [`SPECIAL_CHARACTERS`]. Reports the first failed criterion in that order.
pub fn validate_strength(password: Option<&str>) -> Result<(), PasswordWeakness> {
    let password = match password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(PasswordWeakness::Missing),
    };

    if password.chars().count() < MIN_LENGTH {
        return Err(PasswordWeakness::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordWeakness::NoUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordWeakness::NoLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordWeakness::NoDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err(PasswordWeakness::NoSpecialCharacter);
    }
    Ok(())
}

fn salt() -> Result<SaltString, argon2::password_hash::Error> {
    use rand::Rng;
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    SaltString::encode_b64(&bytes)
}

/// Hashes a password with a fresh random salt. A failure here is fatal to the request.
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = salt()?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
}

/// Checks a password against a stored digest. A mismatch, or a digest that does
/// not parse, is a plain `false`, never an error.
pub fn verify(password: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
