//! Database layer.
//!
//! Session logic only sees the repository traits; `MemoryDb` is the
//! in-process implementation used by the server and by tests.

pub mod memory;

pub use memory::MemoryDb;

use crate::models::{NewUser, RefreshTokenWrapper, User};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Storage-level failures.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A uniqueness constraint rejected the write; carries one message per
    /// violated constraint.
    #[error("Constraint violation: {}", join_messages(.0))]
    ConstraintViolation(BTreeSet<String>),

    #[error("Record not found")]
    NotFound,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn join_messages(messages: &BTreeSet<String>) -> String {
    messages.iter().cloned().collect::<Vec<_>>().join("; ")
}

/// Account persistence with name, nickname and email uniqueness.
///
/// `insert_user` and `update_user` must enforce uniqueness atomically
/// (insert-or-fail), not by read-then-write.
pub trait AccountRepository: Send + Sync {
    fn exists_by_name(&self, name: &str) -> Result<bool, DbError>;
    fn exists_by_nickname(&self, nickname: &str) -> Result<bool, DbError>;
    fn exists_by_email(&self, email: &str) -> Result<bool, DbError>;

    fn find_by_id(&self, id: i64) -> Result<Option<User>, DbError>;
    fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, DbError>;

    /// Insert a new account, assigning its id.
    fn insert_user(&self, user: NewUser) -> Result<User, DbError>;

    /// Replace an existing account. Fails with `NotFound` if it is gone.
    fn update_user(&self, user: &User) -> Result<(), DbError>;

    /// Remove an account, returning it if it existed.
    fn delete_user(&self, id: i64) -> Result<Option<User>, DbError>;
}

/// Refresh wrapper persistence, keyed by token digest.
pub trait RefreshTokenRepository: Send + Sync {
    fn save_wrapper(&self, wrapper: &RefreshTokenWrapper) -> Result<(), DbError>;
    fn find_wrapper(&self, token_hash: &str) -> Result<Option<RefreshTokenWrapper>, DbError>;

    /// Atomically remove and return a wrapper.
    fn take_wrapper(&self, token_hash: &str) -> Result<Option<RefreshTokenWrapper>, DbError>;

    fn wrappers_for_user(&self, user_id: i64) -> Result<Vec<RefreshTokenWrapper>, DbError>;
    fn delete_wrappers_for_user(&self, user_id: i64) -> Result<usize, DbError>;

    /// Remove every wrapper expired at `now`.
    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DbError>;
}
