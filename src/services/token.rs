// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed access and refresh tokens.
//!
//! Tokens are HS256 JWTs carrying the user id and an absolute expiry. They
//! verify offline; revocation of refresh tokens is layered on top by
//! [`RefreshTokenStore`](crate::services::RefreshTokenStore).

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Which credential a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Account id
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Random token id; keeps tokens issued in the same second distinct
    pub jti: String,
    pub kind: TokenKind,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        crate::time_utils::from_unix_seconds(self.exp)
    }

    /// True iff `now` is strictly after the embedded expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }
}

/// Issues and verifies tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(signing_key: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is judged by `is_expired`, so parsing only fails on
        // signature or structure problems.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            validation,
        }
    }

    /// Create a token for `user_id` valid for `validity` from now.
    pub fn issue(
        &self,
        user_id: i64,
        kind: TokenKind,
        validity: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(validity).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Token validity {} overflows", validity))
        })?;
        let claims = Claims {
            user_id,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    /// Verify the signature and decode the claims.
    pub fn parse(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                AppError::InvalidToken
            })
    }

    /// True iff the current time is strictly after the token's expiry.
    pub fn is_expired(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.parse(token)?.is_expired_at(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

    #[test]
    fn test_issue_then_parse_keeps_user_and_kind() {
        let codec = TokenCodec::new(KEY);
        let token = codec
            .issue(42, TokenKind::Access, Duration::minutes(15))
            .unwrap();

        let claims = codec.parse(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
        assert!(!codec.is_expired(&token).unwrap());
    }

    #[test]
    fn test_past_expiry_parses_but_is_expired() {
        let codec = TokenCodec::new(KEY);
        let token = codec
            .issue(42, TokenKind::Refresh, Duration::seconds(-60))
            .unwrap();

        assert!(codec.parse(&token).is_ok());
        assert!(codec.is_expired(&token).unwrap());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = TokenCodec::new(KEY)
            .issue(1, TokenKind::Access, Duration::minutes(1))
            .unwrap();
        let other = TokenCodec::new(b"another_signing_key_32_bytes!!!!");
        assert!(matches!(other.parse(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = TokenCodec::new(KEY);
        assert!(matches!(codec.parse("not.a.jwt"), Err(AppError::InvalidToken)));
        assert!(matches!(codec.parse(""), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_overflowing_validity_is_an_error() {
        let codec = TokenCodec::new(KEY);
        let result = codec.issue(1, TokenKind::Refresh, Duration::milliseconds(i64::MAX));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_same_second_tokens_differ() {
        let codec = TokenCodec::new(KEY);
        let a = codec.issue(1, TokenKind::Refresh, Duration::days(1)).unwrap();
        let b = codec.issue(1, TokenKind::Refresh, Duration::days(1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_claims_expiry_is_strict() {
        let now = Utc::now();
        let claims = Claims {
            user_id: 1,
            exp: now.timestamp(),
            iat: now.timestamp(),
            jti: "j".to_string(),
            kind: TokenKind::Access,
        };
        assert!(!claims.is_expired_at(now));
        assert!(claims.is_expired_at(now + Duration::seconds(1)));
        assert_eq!(claims.expires_at().timestamp(), now.timestamp());
    }
}
