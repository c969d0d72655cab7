// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Chat backend sessions: accounts, authentication and token lifecycle.
//!
//! This crate provides user registration and login, short-lived access
//! tokens with rotating refresh tokens, and the request-scoped security
//! context that chat and message handlers rely on.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::MemoryDb;
use error::AppError;
use services::SessionManager;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: MemoryDb,
    pub sessions: SessionManager,
}

impl AppState {
    /// Wire the session manager to a fresh in-memory store.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let db = MemoryDb::new();
        let sessions = SessionManager::new(&config, Arc::new(db.clone()), Arc::new(db.clone()))?;
        Ok(Self {
            config,
            db,
            sessions,
        })
    }
}
