// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::ACCESS_TOKEN_COOKIE;
use crate::models::{
    Credentials, NewUserRequest, PasswordChange, ProfileUpdate, RefreshRequest, SecurityContext,
    UserDto, UserSecurityTokens,
};
use crate::AppState;

/// User routes. `resolve_security_context` is layered on in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/user", post(register).put(change_profile))
        .route("/api/v1/user/session", post(login).delete(logout))
        .route("/api/v1/user/session/refresh", post(refresh))
        .route("/api/v1/user/me", get(get_me))
        .route("/api/v1/user/password", put(change_password))
        .route("/api/v1/user/nickname/{nickname}", get(get_user_by_nickname))
        .route("/api/v1/user/{id}", get(get_user).delete(delete_user))
}

// ─── Cookies ─────────────────────────────────────────────────

/// HttpOnly cookie carrying the access token; `Secure` unless the
/// frontend is served over plain http (local development).
fn access_token_cookie(state: &AppState, token: &str) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.frontend_url.starts_with("https://"))
        .max_age(time::Duration::seconds(
            state.config.access_token_validity.num_seconds().max(0),
        ))
        .build()
}

fn with_session_cookie(
    state: &AppState,
    jar: CookieJar,
    tokens: UserSecurityTokens,
) -> (CookieJar, Json<UserSecurityTokens>) {
    let jar = jar.add(access_token_cookie(state, &tokens.access_token));
    (jar, Json(tokens))
}

fn without_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
}

// ─── Sessions ────────────────────────────────────────────────

/// Register a new account and return its first token pair.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(candidate): Json<NewUserRequest>,
) -> Result<(CookieJar, Json<UserSecurityTokens>)> {
    let tokens = state.sessions.register(candidate).await?;
    Ok(with_session_cookie(&state, jar, tokens))
}

/// Log in with nickname and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<UserSecurityTokens>)> {
    let tokens = state.sessions.login(credentials).await?;
    Ok(with_session_cookie(&state, jar, tokens))
}

/// Rotate a refresh token into a new token pair.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> Result<(CookieJar, Json<UserSecurityTokens>)> {
    let tokens = state.sessions.refresh(&body.refresh_token)?;
    Ok(with_session_cookie(&state, jar, tokens))
}

/// Revoke a refresh token and drop the access token cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> Result<(StatusCode, CookieJar)> {
    state.sessions.logout(&body.refresh_token)?;
    Ok((StatusCode::NO_CONTENT, without_session_cookie(jar)))
}

// ─── Current User ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SecurityContext>,
) -> Result<Json<UserDto>> {
    state
        .sessions
        .current_user(&ctx)
        .map(|user| Json(UserDto::from(user)))
        .ok_or_else(|| AppError::UserNotLoggedIn("You are not logged in".to_string()))
}

async fn change_profile(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SecurityContext>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserDto>> {
    Ok(Json(state.sessions.change_profile(&ctx, update)?))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SecurityContext>,
    Json(change): Json<PasswordChange>,
) -> Result<Json<UserDto>> {
    Ok(Json(state.sessions.change_password(&ctx, change).await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SecurityContext>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<(CookieJar, Json<UserDto>)> {
    let deleted = state.sessions.delete(&ctx, id)?;
    Ok((without_session_cookie(jar), Json(deleted)))
}

// ─── Lookups ─────────────────────────────────────────────────

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserDto>> {
    Ok(Json(state.sessions.get_user(id)?))
}

async fn get_user_by_nickname(
    State(state): State<Arc<AppState>>,
    Path(nickname): Path<String>,
) -> Result<Json<UserDto>> {
    Ok(Json(state.sessions.get_user_by_nickname(&nickname)?))
}
