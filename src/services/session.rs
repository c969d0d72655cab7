// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager: registration, login, token rotation and account changes.
//!
//! Every operation that depends on the caller's identity takes the
//! request's [`SecurityContext`] explicitly.

use crate::config::{check_validity_bound, Config};
use crate::db::{AccountRepository, DbError, RefreshTokenRepository};
use crate::error::{AppError, Result};
use crate::models::{
    Credentials, NewUser, NewUserRequest, PasswordChange, ProfileUpdate, SecurityContext, User,
    UserDto, UserSecurityTokens,
};
use crate::services::password::PasswordHasher;
use crate::services::refresh_tokens::RefreshTokenStore;
use crate::services::token::{TokenCodec, TokenKind};
use chrono::{Duration, Utc};
use std::sync::Arc;
use validator::Validate;

/// Coordinates accounts, password hashing, tokens and refresh wrappers.
#[derive(Clone)]
pub struct SessionManager {
    accounts: Arc<dyn AccountRepository>,
    refresh_tokens: RefreshTokenStore,
    codec: TokenCodec,
    hasher: PasswordHasher,
    access_token_validity: Duration,
    refresh_token_validity: Duration,
}

impl SessionManager {
    pub fn new(
        config: &Config,
        accounts: Arc<dyn AccountRepository>,
        refresh_repo: Arc<dyn RefreshTokenRepository>,
    ) -> Result<Self> {
        check_validity_bound("access_token_validity", config.access_token_validity)
            .map_err(anyhow::Error::from)?;
        check_validity_bound("refresh_token_validity", config.refresh_token_validity)
            .map_err(anyhow::Error::from)?;

        Ok(Self {
            accounts,
            refresh_tokens: RefreshTokenStore::new(refresh_repo),
            codec: TokenCodec::new(&config.jwt_signing_key),
            hasher: PasswordHasher::new(config.bcrypt_cost)?,
            access_token_validity: config.access_token_validity,
            refresh_token_validity: config.refresh_token_validity,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore {
        &self.refresh_tokens
    }

    // ─── Registration & Login ────────────────────────────────────

    /// Create an account and open its first session.
    ///
    /// Password hashing runs on the blocking pool; the caller awaits the
    /// result before responding.
    pub async fn register(&self, candidate: NewUserRequest) -> Result<UserSecurityTokens> {
        candidate.validate()?;
        self.check_fields_uniqueness(&candidate.name, &candidate.nickname, &candidate.email)?;

        let NewUserRequest {
            name,
            nickname,
            email,
            password,
        } = candidate;
        let password_hash = self.hasher.hash_blocking(password).await?;

        // The storage insert re-checks uniqueness; losing a race with a
        // concurrent registration surfaces here.
        let user = self
            .accounts
            .insert_user(NewUser {
                name,
                nickname,
                email,
                password_hash,
            })
            .map_err(|err| {
                if let DbError::ConstraintViolation(ref messages) = err {
                    tracing::warn!(?messages, "Registration lost a uniqueness race");
                }
                AppError::from(err)
            })?;

        tracing::info!(user_id = user.id, nickname = %user.nickname, "Registered user");
        self.issue_tokens(&user)
    }

    /// Authenticate by nickname and password and open a new session.
    ///
    /// Existing sessions of the same user stay valid.
    pub async fn login(&self, credentials: Credentials) -> Result<UserSecurityTokens> {
        let Credentials { nickname, password } = credentials;

        let Some(user) = self.accounts.find_by_nickname(&nickname)? else {
            self.hasher.verify_dummy_blocking(password).await?;
            tracing::warn!(nickname = %nickname, "Login failed: unknown nickname");
            return Err(AppError::bad_credentials());
        };

        let matches = self
            .hasher
            .verify_blocking(password, user.password_hash.clone())
            .await?;
        if !matches {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(AppError::bad_credentials());
        }

        tracing::info!(user_id = user.id, "User logged in");
        self.issue_tokens(&user)
    }

    // ─── Token Lifecycle ─────────────────────────────────────────

    /// Exchange a refresh token for a new token pair.
    ///
    /// The presented token is consumed, so each refresh token works once.
    pub fn refresh(&self, refresh_token: &str) -> Result<UserSecurityTokens> {
        let claims = self.codec.parse(refresh_token)?;
        if claims.kind != TokenKind::Refresh || claims.is_expired_at(Utc::now()) {
            return Err(AppError::InvalidToken);
        }

        if !self.refresh_tokens.revoke(refresh_token)? {
            tracing::warn!(user_id = claims.user_id, "Refresh token has no live wrapper");
            return Err(AppError::InvalidToken);
        }

        let user = self
            .accounts
            .find_by_id(claims.user_id)?
            .ok_or(AppError::InvalidToken)?;

        tracing::info!(user_id = user.id, "Rotated refresh token");
        self.issue_tokens(&user)
    }

    /// Revoke a refresh token. Revoking an unknown token is not an error.
    pub fn logout(&self, refresh_token: &str) -> Result<()> {
        let claims = self.codec.parse(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::InvalidToken);
        }

        let revoked = self.refresh_tokens.revoke(refresh_token)?;
        tracing::info!(user_id = claims.user_id, revoked, "User logged out");
        Ok(())
    }

    /// Resolve an access token to the account it was issued for.
    pub fn resolve_principal(&self, access_token: &str) -> Result<User> {
        let claims = self.codec.parse(access_token)?;
        if claims.kind != TokenKind::Access || claims.is_expired_at(Utc::now()) {
            return Err(AppError::InvalidToken);
        }

        self.accounts
            .find_by_id(claims.user_id)?
            .ok_or(AppError::InvalidToken)
    }

    /// Drop expired refresh wrappers.
    pub fn purge_expired_refresh_tokens(&self) -> Result<usize> {
        self.refresh_tokens.purge_expired()
    }

    // ─── Current User ────────────────────────────────────────────

    /// The authenticated user of this request, if any.
    pub fn current_user<'a>(&self, ctx: &'a SecurityContext) -> Option<&'a User> {
        ctx.principal()
    }

    /// Delete the caller's own account.
    ///
    /// `id` must name the caller; deleting anyone else is forbidden.
    pub fn delete(&self, ctx: &SecurityContext, id: i64) -> Result<UserDto> {
        let current = ctx.require("You must be logged in to delete your account")?;
        if current.id != id {
            tracing::warn!(user_id = current.id, target = id, "Refused foreign account deletion");
            return Err(AppError::Forbidden(
                "You can only delete your own account".to_string(),
            ));
        }

        let revoked = self.refresh_tokens.revoke_all(current.id)?;
        let deleted = self
            .accounts
            .delete_user(current.id)?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", current.id)))?;

        tracing::info!(user_id = deleted.id, revoked, "Deleted account");
        Ok(UserDto::from(&deleted))
    }

    /// Apply the non-empty fields of `update` to the caller's profile.
    ///
    /// All checks run before the single write, so a rejected update
    /// changes nothing.
    pub fn change_profile(&self, ctx: &SecurityContext, update: ProfileUpdate) -> Result<UserDto> {
        update.validate()?;
        let principal = ctx.require("You must be logged in to change your profile")?;
        let mut user = self.load_current(principal)?;

        let ProfileUpdate {
            name,
            nickname,
            email,
        } = update;

        if let Some(name) = name.filter(|name| *name != user.name) {
            if self.accounts.exists_by_name(&name)? {
                return Err(already_exists("name", name));
            }
            user.name = name;
        }
        if let Some(nickname) = nickname.filter(|nickname| *nickname != user.nickname) {
            if self.accounts.exists_by_nickname(&nickname)? {
                return Err(already_exists("nickname", nickname));
            }
            user.nickname = nickname;
        }
        if let Some(email) = email.filter(|email| *email != user.email) {
            if self.accounts.exists_by_email(&email)? {
                return Err(already_exists("email", email));
            }
            user.email = email;
        }

        self.store_user(&user)?;
        tracing::info!(user_id = user.id, "Changed profile");
        Ok(UserDto::from(&user))
    }

    /// Replace the caller's password and end all of their sessions.
    pub async fn change_password(
        &self,
        ctx: &SecurityContext,
        change: PasswordChange,
    ) -> Result<UserDto> {
        change.validate()?;
        let principal = ctx.require("You must be logged in to change your password")?;
        let mut user = self.load_current(principal)?;

        let PasswordChange {
            current_password,
            new_password,
        } = change;

        let matches = self
            .hasher
            .verify_blocking(current_password, user.password_hash.clone())
            .await?;
        if !matches {
            tracing::warn!(user_id = user.id, "Password change with wrong current password");
            return Err(AppError::Authentication(
                "Current password is incorrect".to_string(),
            ));
        }

        user.password_hash = self.hasher.hash_blocking(new_password).await?;
        self.store_user(&user)?;
        self.refresh_tokens.revoke_all(user.id)?;

        tracing::info!(user_id = user.id, "Changed password");
        Ok(UserDto::from(&user))
    }

    // ─── Lookups ─────────────────────────────────────────────────

    pub fn get_user(&self, id: i64) -> Result<UserDto> {
        self.accounts
            .find_by_id(id)?
            .map(|user| UserDto::from(&user))
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub fn get_user_by_nickname(&self, nickname: &str) -> Result<UserDto> {
        self.accounts
            .find_by_nickname(nickname)?
            .map(|user| UserDto::from(&user))
            .ok_or_else(|| AppError::NotFound(format!("User [{}] not found", nickname)))
    }

    // ─── Helpers ─────────────────────────────────────────────────

    /// Issue an access/refresh pair and persist the refresh wrapper.
    fn issue_tokens(&self, user: &User) -> Result<UserSecurityTokens> {
        let access_token =
            self.codec
                .issue(user.id, TokenKind::Access, self.access_token_validity)?;
        let refresh_token =
            self.codec
                .issue(user.id, TokenKind::Refresh, self.refresh_token_validity)?;

        let wrapper =
            self.refresh_tokens
                .create_wrapper(&refresh_token, self.refresh_token_validity, user);
        self.refresh_tokens.save(&wrapper)?;

        Ok(UserSecurityTokens {
            user: UserDto::from(user),
            access_token,
            refresh_token,
        })
    }

    /// Checked in name, nickname, email order; stops at the first clash.
    fn check_fields_uniqueness(&self, name: &str, nickname: &str, email: &str) -> Result<()> {
        if self.accounts.exists_by_name(name)? {
            return Err(already_exists("name", name));
        }
        if self.accounts.exists_by_nickname(nickname)? {
            return Err(already_exists("nickname", nickname));
        }
        if self.accounts.exists_by_email(email)? {
            return Err(already_exists("email", email));
        }
        Ok(())
    }

    /// Fresh copy of the principal's row; the context may be stale.
    fn load_current(&self, principal: &User) -> Result<User> {
        self.accounts
            .find_by_id(principal.id)?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", principal.id)))
    }

    fn store_user(&self, user: &User) -> Result<()> {
        self.accounts.update_user(user).map_err(|err| match err {
            DbError::NotFound => AppError::NotFound(format!("User {} not found", user.id)),
            other => other.into(),
        })
    }
}

fn already_exists(field: &'static str, value: impl Into<String>) -> AppError {
    AppError::EntityAlreadyExists {
        field,
        value: value.into(),
    }
}
