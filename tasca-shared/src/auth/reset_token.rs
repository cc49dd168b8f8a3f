/// Password-reset tokens
///
/// The plaintext token (16 random bytes, hex encoded) is only ever sent to
/// the user by email. The database keeps its SHA-256 digest, so a leaked
/// table cannot be used to reset passwords.

use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a reset token
pub const RESET_TOKEN_BYTES: usize = 16;

/// How long a reset token stays valid
pub fn reset_token_ttl() -> Duration {
    Duration::minutes(30)
}

/// Generates a new plaintext reset token (32 hex characters)
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hashes a plaintext token for storage and lookup
pub fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.trim().as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_token_format() {
        let token = generate_reset_token();

        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_hash_is_stable_and_distinct() {
        let token = generate_reset_token();

        assert_eq!(hash_reset_token(&token), hash_reset_token(&token));
        assert_ne!(hash_reset_token(&token), token);
        assert_eq!(hash_reset_token(&token).len(), 64);
    }
}
