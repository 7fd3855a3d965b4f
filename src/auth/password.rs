//! Argon2id credential hashing, verification, and strength validation.
//!
//! All hashes use the Argon2id variant with a cryptographically random salt
//! generated via [`OsRng`]. The PHC string format is used for storage so that
//! algorithm parameters and salt are embedded in the hash itself. The same
//! primitive hashes session tokens: a leaked session table yields nothing a
//! client could replay.

use crate::error::{PollError, PollResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use lazy_static::lazy_static;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

lazy_static! {
    /// Fixed hash verified when no account matches a login email, so the
    /// hashing cost is paid identically on the unknown-account and
    /// wrong-password paths and response timing reveals neither.
    static ref DUMMY_HASH: String = hash_password("pollbox.dummy.credential")
        .expect("argon2 hashing with default parameters cannot fail");
}

/// Hash a plaintext secret using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string (includes algorithm, params, salt, and hash).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext secret against a stored PHC-formatted Argon2id hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
/// The comparison inside Argon2 verification is constant-time with respect
/// to the secret.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// The fixed dummy hash for timing-equalized login flows.
pub fn dummy_hash() -> &'static str {
    &DUMMY_HASH
}

/// Validate that a password meets minimum strength requirements:
/// at least [`MIN_PASSWORD_LENGTH`] characters, one letter, one digit.
pub fn validate_password_strength(password: &str) -> PollResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(PollError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(PollError::Validation(
            "Password must contain at least one letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PollError::Validation(
            "Password must contain at least one digit".to_string(),
        ));
    }

    Ok(())
}
