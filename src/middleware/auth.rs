// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token authentication middleware.

use crate::models::SecurityContext;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie that may carry the access token instead of the header.
pub const ACCESS_TOKEN_COOKIE: &str = "chat_access_token";

/// Resolve the request's principal and attach a [`SecurityContext`].
///
/// Missing, malformed, expired or revoked-user tokens all yield an
/// anonymous context; handlers decide whether that is an error.
pub async fn resolve_security_context(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    // Try cookie first, then header; a stale cookie must not hide a good header
    let cookie_token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let bearer_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    let context = [cookie_token, bearer_token]
        .into_iter()
        .flatten()
        .find_map(|token| match state.sessions.resolve_principal(&token) {
            Ok(user) => Some(SecurityContext::authenticated(user)),
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring unusable access token");
                None
            }
        })
        .unwrap_or_else(SecurityContext::anonymous);

    if let Some(user) = context.principal() {
        tracing::debug!(user_id = user.id, "Authenticated request");
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}
