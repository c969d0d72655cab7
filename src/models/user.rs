//! User model for storage and API.

use crate::services::PasswordHasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Account stored in the account repository.
///
/// `password_hash` only ever holds a bcrypt hash.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// Login handle (unique)
    pub nickname: String,
    /// Email address (unique)
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("nickname", &self.nickname)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Row handed to the repository on registration; the id is assigned on insert.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
}

/// Public representation of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserDto {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub name: String,
    pub nickname: String,
    pub email: String,
    pub created_at: String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            created_at: crate::time_utils::format_utc_rfc3339(user.created_at),
        }
    }
}

// ─── Requests ────────────────────────────────────────────────

/// Registration candidate.
///
/// Missing fields deserialize as empty strings so they are reported by
/// validation rather than rejected by the JSON extractor.
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewUserRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be between 1 and 64 characters"))]
    pub name: String,
    #[validate(length(
        min = 2,
        max = 32,
        message = "Nickname must be between 2 and 32 characters"
    ))]
    pub nickname: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(
        length(
            min = 8,
            max = 72,
            message = "Password must be between 8 and 72 characters"
        ),
        custom(function = "validate_password_bytes")
    )]
    pub password: String,
}

impl std::fmt::Debug for NewUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUserRequest")
            .field("name", &self.name)
            .field("nickname", &self.nickname)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Login credentials.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub nickname: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("nickname", &self.nickname)
            .finish_non_exhaustive()
    }
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 64, message = "Name must be between 1 and 64 characters"))]
    pub name: Option<String>,
    #[validate(length(
        min = 2,
        max = 32,
        message = "Nickname must be between 2 and 32 characters"
    ))]
    pub nickname: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: Option<String>,
}

/// Password change request.
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PasswordChange {
    pub current_password: String,
    #[validate(
        length(
            min = 8,
            max = 72,
            message = "Password must be between 8 and 72 characters"
        ),
        custom(function = "validate_password_bytes")
    )]
    pub new_password: String,
}

fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > PasswordHasher::MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("password_bytes")
            .with_message("Password must not exceed 72 bytes".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> NewUserRequest {
        NewUserRequest {
            name: "alice".to_string(),
            nickname: "al1".to_string(),
            email: "a@x.com".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_valid_candidate_passes() {
        assert!(candidate().validate().is_ok());
    }

    #[test]
    fn test_short_password_rejected() {
        let mut req = candidate();
        req.password = "short".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_password_limit_counts_bytes() {
        let mut req = candidate();
        // 36 characters, 72 bytes
        req.password = "é".repeat(36);
        assert!(req.validate().is_ok());

        // 40 characters, 80 bytes
        req.password = "é".repeat(40);
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let change = PasswordChange {
            current_password: "whatever".to_string(),
            new_password: "€".repeat(30),
        };
        assert!(change.validate().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", candidate());
        assert!(!rendered.contains("correct horse"));

        let creds = Credentials {
            nickname: "al".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter22"));
    }

    #[test]
    fn test_empty_profile_update_is_valid() {
        assert!(ProfileUpdate::default().validate().is_ok());

        let bad = ProfileUpdate {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
