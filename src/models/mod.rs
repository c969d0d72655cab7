// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod refresh_token;
pub mod session;
pub mod user;

pub use refresh_token::RefreshTokenWrapper;
pub use session::{RefreshRequest, SecurityContext, UserSecurityTokens};
pub use user::{Credentials, NewUser, NewUserRequest, PasswordChange, ProfileUpdate, User, UserDto};
