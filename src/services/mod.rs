// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod password;
pub mod refresh_tokens;
pub mod session;
pub mod token;

pub use password::PasswordHasher;
pub use refresh_tokens::RefreshTokenStore;
pub use session::SessionManager;
pub use token::{Claims, TokenCodec, TokenKind};
