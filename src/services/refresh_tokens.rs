// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh token wrappers: persistence, revocation and the expiry sweep.

use crate::db::RefreshTokenRepository;
use crate::error::AppError;
use crate::models::refresh_token::hash_token;
use crate::models::{RefreshTokenWrapper, User};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Server-side record of issued refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenStore {
    repo: Arc<dyn RefreshTokenRepository>,
}

impl RefreshTokenStore {
    pub fn new(repo: Arc<dyn RefreshTokenRepository>) -> Self {
        Self { repo }
    }

    /// Build a wrapper for `token` owned by `owner`. Nothing is stored.
    pub fn create_wrapper(
        &self,
        token: &str,
        validity: Duration,
        owner: &User,
    ) -> RefreshTokenWrapper {
        let issued_at = Utc::now();
        RefreshTokenWrapper {
            token_hash: hash_token(token),
            user_id: owner.id,
            issued_at,
            expires_at: issued_at
                .checked_add_signed(validity)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn save(&self, wrapper: &RefreshTokenWrapper) -> Result<(), AppError> {
        self.repo.save_wrapper(wrapper)?;
        tracing::debug!(user_id = wrapper.user_id, "Saved refresh token wrapper");
        Ok(())
    }

    /// A live, unexpired wrapper exists for `token`.
    ///
    /// Signature and expiry of the token itself are checked by the codec.
    pub fn is_valid(&self, token: &str) -> Result<bool, AppError> {
        let now = Utc::now();
        Ok(self
            .repo
            .find_wrapper(&hash_token(token))?
            .is_some_and(|wrapper| !wrapper.is_expired_at(now)))
    }

    /// Remove the wrapper for `token`.
    ///
    /// Returns true only if a live wrapper was consumed; of several
    /// concurrent callers at most one sees true.
    pub fn revoke(&self, token: &str) -> Result<bool, AppError> {
        let now = Utc::now();
        Ok(self
            .repo
            .take_wrapper(&hash_token(token))?
            .is_some_and(|wrapper| !wrapper.is_expired_at(now)))
    }

    /// Revoke every refresh token held by `user_id`.
    pub fn revoke_all(&self, user_id: i64) -> Result<usize, AppError> {
        let revoked = self.repo.delete_wrappers_for_user(user_id)?;
        tracing::info!(user_id, revoked, "Revoked refresh tokens");
        Ok(revoked)
    }

    /// Number of unexpired sessions held by `user_id`.
    pub fn active_sessions(&self, user_id: i64) -> Result<usize, AppError> {
        let now = Utc::now();
        Ok(self
            .repo
            .wrappers_for_user(user_id)?
            .iter()
            .filter(|wrapper| !wrapper.is_expired_at(now))
            .count())
    }

    /// Drop wrappers whose validity window has closed.
    pub fn purge_expired(&self) -> Result<usize, AppError> {
        let purged = self.repo.delete_expired(Utc::now())?;
        if purged > 0 {
            tracing::info!(purged, "Purged expired refresh tokens");
        }
        Ok(purged)
    }
}
