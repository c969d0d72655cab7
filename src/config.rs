// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Token lifetimes and the signing secret are supplied externally; the
//! session layer never computes them.

use chrono::Duration;
use std::env;

const DEFAULT_ACCESS_TOKEN_VALIDITY_MS: i64 = 15 * 60 * 1000;
const DEFAULT_REFRESH_TOKEN_VALIDITY_MS: i64 = 14 * 24 * 60 * 60 * 1000;
const DEFAULT_REFRESH_SWEEP_INTERVAL_SECS: u64 = 3600;
/// Longest accepted token lifetime (ten years).
pub const MAX_TOKEN_VALIDITY_MS: i64 = 10 * 365 * 24 * 60 * 60 * 1000;

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// HMAC signing key for access and refresh tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Lifetime of access tokens
    pub access_token_validity: Duration,
    /// Lifetime of refresh tokens and their wrappers
    pub refresh_token_validity: Duration,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// How often expired refresh wrappers are swept
    pub refresh_sweep_interval_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("frontend_url", &self.frontend_url)
            .field("port", &self.port)
            .field("jwt_signing_key", &"<redacted>")
            .field("access_token_validity", &self.access_token_validity)
            .field("refresh_token_validity", &self.refresh_token_validity)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field(
                "refresh_sweep_interval_secs",
                &self.refresh_sweep_interval_secs,
            )
            .finish()
    }
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            access_token_validity: Duration::milliseconds(DEFAULT_ACCESS_TOKEN_VALIDITY_MS),
            refresh_token_validity: Duration::milliseconds(DEFAULT_REFRESH_TOKEN_VALIDITY_MS),
            bcrypt_cost: 4,
            refresh_sweep_interval_secs: DEFAULT_REFRESH_SWEEP_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Cheap configuration for tests (minimum bcrypt cost).
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();
        if jwt_signing_key.is_empty() {
            return Err(ConfigError::Invalid(
                "JWT_SIGNING_KEY",
                "must not be empty".to_string(),
            ));
        }

        let bcrypt_cost = parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid(
                "BCRYPT_COST",
                format!("{} is outside 4..=31", bcrypt_cost),
            ));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_var("PORT", 8080)?,
            jwt_signing_key,
            access_token_validity: parse_validity(
                "ACCESS_TOKEN_VALIDITY_MS",
                DEFAULT_ACCESS_TOKEN_VALIDITY_MS,
            )?,
            refresh_token_validity: parse_validity(
                "REFRESH_TOKEN_VALIDITY_MS",
                DEFAULT_REFRESH_TOKEN_VALIDITY_MS,
            )?,
            bcrypt_cost,
            refresh_sweep_interval_secs: parse_var(
                "REFRESH_SWEEP_INTERVAL_SECS",
                DEFAULT_REFRESH_SWEEP_INTERVAL_SECS,
            )?,
        })
    }
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_validity(name: &'static str, default_ms: i64) -> Result<Duration, ConfigError> {
    let ms: i64 = parse_var(name, default_ms)?;
    if ms <= 0 {
        return Err(ConfigError::Invalid(name, "must be positive".to_string()));
    }
    if ms > MAX_TOKEN_VALIDITY_MS {
        return Err(ConfigError::Invalid(
            name,
            format!("must not exceed {} ms", MAX_TOKEN_VALIDITY_MS),
        ));
    }
    Ok(Duration::milliseconds(ms))
}

/// Reject lifetimes too long to turn into an expiry timestamp.
pub(crate) fn check_validity_bound(
    name: &'static str,
    validity: Duration,
) -> Result<(), ConfigError> {
    if validity > Duration::milliseconds(MAX_TOKEN_VALIDITY_MS) {
        return Err(ConfigError::Invalid(
            name,
            format!("must not exceed {} ms", MAX_TOKEN_VALIDITY_MS),
        ));
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
