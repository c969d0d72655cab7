// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side record backing an issued refresh token.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Persisted wrapper for a refresh token.
///
/// Only the SHA-256 digest of the token is kept; a refresh token is honored
/// only while its wrapper exists and has not expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenWrapper {
    /// Hex-encoded SHA-256 of the token string (storage identity)
    pub token_hash: String,
    /// Owning user
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenWrapper {
    /// Check if the wrapper has expired at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Digest used to key wrappers by token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_token("abd"), digest);
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let wrapper = RefreshTokenWrapper {
            token_hash: hash_token("t"),
            user_id: 1,
            issued_at: now - Duration::days(1),
            expires_at: now,
        };
        assert!(!wrapper.is_expired_at(now));
        assert!(wrapper.is_expired_at(now + Duration::seconds(1)));
    }
}
