//! Opaque token generation from the operating system's secure random source.

use crate::error::{PollError, PollResult};
use rand::{rngs::OsRng, RngCore};

/// Character length of session tokens
pub const SESSION_TOKEN_LENGTH: usize = 64;

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                               abcdefghijklmnopqrstuvwxyz\
                               0123456789";

/// Generate an opaque alphanumeric token of the requested character length.
///
/// Bytes are drawn from [`OsRng`]. If the OS randomness source is
/// unavailable this returns an error; there is no fallback to a weaker
/// generator.
pub fn generate_token(length: usize) -> PollResult<String> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| PollError::Internal(format!("Secure randomness source unavailable: {}", e)))?;

    Ok(bytes
        .iter()
        .map(|b| TOKEN_CHARSET[*b as usize % TOKEN_CHARSET.len()] as char)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_length() {
        let token = generate_token(SESSION_TOKEN_LENGTH).unwrap();
        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);

        let short = generate_token(16).unwrap();
        assert_eq!(short.len(), 16);
    }

    #[test]
    fn test_token_charset() {
        let token = generate_token(256).unwrap();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let mut tokens = HashSet::new();
        for _ in 0..100 {
            tokens.insert(generate_token(SESSION_TOKEN_LENGTH).unwrap());
        }
        assert_eq!(tokens.len(), 100);
    }
}
