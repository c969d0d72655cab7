// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::db::{join_messages, DbError};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid entity: {}", join_messages(.0))]
    InvalidEntity(BTreeSet<String>),

    #[error("User with {field} [{value}] already exists")]
    EntityAlreadyExists { field: &'static str, value: String },

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    UserNotLoggedIn(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message shared by every failed login, whichever part was wrong.
    pub const BAD_CREDENTIALS: &'static str =
        "Couldn't find the user with provided nickname and password";

    pub fn invalid_entity<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::InvalidEntity(messages.into_iter().map(Into::into).collect())
    }

    pub fn bad_credentials() -> Self {
        AppError::Authentication(Self::BAD_CREDENTIALS.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::invalid_entity(errors.field_errors().into_iter().flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid ({})", field, err.code),
            })
        }))
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConstraintViolation(messages) => AppError::InvalidEntity(messages),
            other => AppError::Database(other.to_string()),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details): (StatusCode, &str, Vec<String>) = match &self {
            AppError::InvalidEntity(messages) => (
                StatusCode::BAD_REQUEST,
                "invalid_entity",
                messages.iter().cloned().collect(),
            ),
            AppError::EntityAlreadyExists { .. } => (
                StatusCode::CONFLICT,
                "entity_already_exists",
                vec![self.to_string()],
            ),
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, "bad_credentials", vec![msg.clone()])
            }
            AppError::UserNotLoggedIn(msg) => (
                StatusCode::UNAUTHORIZED,
                "user_not_logged_in",
                vec![msg.clone()],
            ),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", vec![]),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", vec![msg.clone()]),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", vec![msg.clone()]),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", vec![])
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", vec![])
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
