// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chat_sessions::config::Config;
use chat_sessions::models::{NewUserRequest, SecurityContext, UserSecurityTokens};
use chat_sessions::routes::create_router;
use chat_sessions::AppState;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Password used by every test account.
#[allow(dead_code)]
pub const PASSWORD: &str = "password123";

/// Create shared state with the cheap test configuration.
#[allow(dead_code)]
pub fn test_state() -> Arc<AppState> {
    test_state_with(Config::test_default())
}

#[allow(dead_code)]
pub fn test_state_with(config: Config) -> Arc<AppState> {
    Arc::new(AppState::new(config).expect("Failed to build app state"))
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state();
    (create_router(state.clone()), state)
}

#[allow(dead_code)]
pub fn candidate(name: &str, nickname: &str, email: &str) -> NewUserRequest {
    NewUserRequest {
        name: name.to_string(),
        nickname: nickname.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
    }
}

/// Register an account directly through the session manager.
#[allow(dead_code)]
pub async fn register(state: &AppState, name: &str, nickname: &str, email: &str) -> UserSecurityTokens {
    state
        .sessions
        .register(candidate(name, nickname, email))
        .await
        .expect("Registration should succeed")
}

/// Security context for the holder of `tokens`, as the middleware builds it.
#[allow(dead_code)]
pub fn context_for(state: &AppState, tokens: &UserSecurityTokens) -> SecurityContext {
    let user = state
        .sessions
        .resolve_principal(&tokens.access_token)
        .expect("Access token should resolve");
    SecurityContext::authenticated(user)
}

#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    body: serde_json::Value,
    access_token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = access_token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, access_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = access_token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body should be valid JSON")
}
