// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! bcrypt password hashing.
//!
//! Hashing is CPU-bound, so the async helpers hand the work to tokio's
//! blocking pool instead of stalling request workers.

use crate::error::AppError;
use std::sync::Arc;

/// One-way credential hasher.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Verified against when the account does not exist so both login
    /// failure paths cost the same.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, AppError> {
        let dummy_hash = bcrypt::hash("timing-equalizer", cost)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("bcrypt init failed: {}", e)))?;
        Ok(Self {
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// bcrypt ignores everything past this many bytes.
    pub const MAX_PASSWORD_BYTES: usize = 72;

    /// Hash `password`. Longer than 72 bytes is an error, never truncated.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.len() > Self::MAX_PASSWORD_BYTES {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Password exceeds {} bytes",
                Self::MAX_PASSWORD_BYTES
            )));
        }
        bcrypt::hash(password, self.cost)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
    }

    /// A password too long to have been hashed never matches.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        if password.len() > Self::MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        bcrypt::verify(password, hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verification failed: {}", e)))
    }

    /// Spend one verification's worth of work and report a mismatch.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = bcrypt::verify(password, &self.dummy_hash);
        false
    }

    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = self.clone();
        run_blocking(move || hasher.hash(&password)).await
    }

    pub async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.clone();
        run_blocking(move || hasher.verify(&password, &hash)).await
    }

    pub async fn verify_dummy_blocking(&self, password: String) -> Result<bool, AppError> {
        let hasher = self.clone();
        run_blocking(move || Ok(hasher.verify_dummy(&password))).await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
}
