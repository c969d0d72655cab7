// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request-scoped authentication state and token responses.

use crate::error::AppError;
use crate::models::user::{User, UserDto};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Who is making the current request.
///
/// Built once per request by the authentication middleware and passed
/// explicitly to session operations. Never shared between requests.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<User>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            principal: Some(user),
        }
    }

    /// The authenticated user, if any.
    pub fn principal(&self) -> Option<&User> {
        self.principal.as_ref()
    }

    /// The authenticated user, or `UserNotLoggedIn` with `message`.
    pub fn require(&self, message: &str) -> Result<&User, AppError> {
        self.principal
            .as_ref()
            .ok_or_else(|| AppError::UserNotLoggedIn(message.to_string()))
    }
}

/// Token pair returned by registration, login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserSecurityTokens {
    pub user: UserDto,
    pub access_token: String,
    pub refresh_token: String,
}

/// Body carrying a refresh token (refresh and logout).
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}
