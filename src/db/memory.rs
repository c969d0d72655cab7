// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by concurrent maps.
//!
//! Provides:
//! - Users with unique name / nickname / email indexes
//! - Refresh token wrappers keyed by token digest
//!
//! Unique indexes are claimed through the `entry` API, so a colliding
//! concurrent insert sees an occupied entry and fails instead of racing
//! a separate existence check.

use crate::db::{AccountRepository, DbError, RefreshTokenRepository};
use crate::models::{NewUser, RefreshTokenWrapper, User};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UniqueField {
    Name,
    Nickname,
    Email,
}

impl UniqueField {
    fn label(self) -> &'static str {
        match self {
            UniqueField::Name => "name",
            UniqueField::Nickname => "nickname",
            UniqueField::Email => "email",
        }
    }

    fn violation(self, value: &str) -> String {
        format!("{} [{}] is already taken", self.label(), value)
    }
}

#[derive(Default)]
struct Tables {
    next_user_id: AtomicI64,
    users: DashMap<i64, User>,
    names: DashMap<String, i64>,
    nicknames: DashMap<String, i64>,
    emails: DashMap<String, i64>,
    refresh_tokens: DashMap<String, RefreshTokenWrapper>,
}

/// In-memory database. Cheap to clone; clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Tables>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn user_count(&self) -> usize {
        self.tables.users.len()
    }

    fn index(&self, field: UniqueField) -> &DashMap<String, i64> {
        match field {
            UniqueField::Name => &self.tables.names,
            UniqueField::Nickname => &self.tables.nicknames,
            UniqueField::Email => &self.tables.emails,
        }
    }

    /// Reserve `value` for `owner`. Returns false if someone else holds it.
    fn claim(&self, field: UniqueField, value: &str, owner: i64) -> bool {
        match self.index(field).entry(value.to_string()) {
            Entry::Occupied(entry) => *entry.get() == owner,
            Entry::Vacant(entry) => {
                entry.insert(owner);
                true
            }
        }
    }

    fn release(&self, field: UniqueField, value: &str, owner: i64) {
        self.index(field)
            .remove_if(value, |_, holder| *holder == owner);
    }

    /// Claim every `(field, value)` pair or none of them.
    fn claim_all(&self, wanted: &[(UniqueField, &str)], owner: i64) -> Result<(), DbError> {
        let mut claimed = Vec::with_capacity(wanted.len());
        let mut violations = BTreeSet::new();

        for &(field, value) in wanted {
            if self.claim(field, value, owner) {
                claimed.push((field, value));
            } else {
                violations.insert(field.violation(value));
            }
        }

        if violations.is_empty() {
            return Ok(());
        }

        for (field, value) in claimed {
            self.release(field, value, owner);
        }
        Err(DbError::ConstraintViolation(violations))
    }

    fn lookup(&self, field: UniqueField, value: &str) -> Option<User> {
        let id = self.index(field).get(value).map(|entry| *entry.value())?;
        self.tables.users.get(&id).map(|row| row.value().clone())
    }
}

impl AccountRepository for MemoryDb {
    fn exists_by_name(&self, name: &str) -> Result<bool, DbError> {
        Ok(self.tables.names.contains_key(name))
    }

    fn exists_by_nickname(&self, nickname: &str) -> Result<bool, DbError> {
        Ok(self.tables.nicknames.contains_key(nickname))
    }

    fn exists_by_email(&self, email: &str) -> Result<bool, DbError> {
        Ok(self.tables.emails.contains_key(email))
    }

    fn find_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        Ok(self.tables.users.get(&id).map(|row| row.value().clone()))
    }

    fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, DbError> {
        Ok(self.lookup(UniqueField::Nickname, nickname))
    }

    fn insert_user(&self, new_user: NewUser) -> Result<User, DbError> {
        let id = self.tables.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;

        self.claim_all(
            &[
                (UniqueField::Name, new_user.name.as_str()),
                (UniqueField::Nickname, new_user.nickname.as_str()),
                (UniqueField::Email, new_user.email.as_str()),
            ],
            id,
        )?;

        let user = User {
            id,
            name: new_user.name,
            nickname: new_user.nickname,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        self.tables.users.insert(id, user.clone());

        tracing::debug!(user_id = id, "Inserted user");
        Ok(user)
    }

    fn update_user(&self, user: &User) -> Result<(), DbError> {
        // The row guard serializes updates of one account: index changes
        // are computed against the committed row, and old keys are only
        // released while no other update of this row can re-claim them.
        let mut row = self
            .tables
            .users
            .get_mut(&user.id)
            .ok_or(DbError::NotFound)?;

        let changed: Vec<(UniqueField, String, &str)> = [
            (UniqueField::Name, row.name.clone(), user.name.as_str()),
            (
                UniqueField::Nickname,
                row.nickname.clone(),
                user.nickname.as_str(),
            ),
            (UniqueField::Email, row.email.clone(), user.email.as_str()),
        ]
        .into_iter()
        .filter(|(_, old, new)| old.as_str() != *new)
        .collect();

        let wanted: Vec<(UniqueField, &str)> =
            changed.iter().map(|&(field, _, new)| (field, new)).collect();
        self.claim_all(&wanted, user.id)?;

        *row = user.clone();
        for (field, old, _) in &changed {
            self.release(*field, old, user.id);
        }
        Ok(())
    }

    fn delete_user(&self, id: i64) -> Result<Option<User>, DbError> {
        let Some((_, user)) = self.tables.users.remove(&id) else {
            return Ok(None);
        };

        self.release(UniqueField::Name, &user.name, id);
        self.release(UniqueField::Nickname, &user.nickname, id);
        self.release(UniqueField::Email, &user.email, id);

        // Wrappers are owned by the user.
        self.tables
            .refresh_tokens
            .retain(|_, wrapper| wrapper.user_id != id);

        tracing::debug!(user_id = id, "Deleted user");
        Ok(Some(user))
    }
}

impl RefreshTokenRepository for MemoryDb {
    fn save_wrapper(&self, wrapper: &RefreshTokenWrapper) -> Result<(), DbError> {
        self.tables
            .refresh_tokens
            .insert(wrapper.token_hash.clone(), wrapper.clone());
        Ok(())
    }

    fn find_wrapper(&self, token_hash: &str) -> Result<Option<RefreshTokenWrapper>, DbError> {
        Ok(self
            .tables
            .refresh_tokens
            .get(token_hash)
            .map(|row| row.value().clone()))
    }

    fn take_wrapper(&self, token_hash: &str) -> Result<Option<RefreshTokenWrapper>, DbError> {
        Ok(self
            .tables
            .refresh_tokens
            .remove(token_hash)
            .map(|(_, wrapper)| wrapper))
    }

    fn wrappers_for_user(&self, user_id: i64) -> Result<Vec<RefreshTokenWrapper>, DbError> {
        Ok(self
            .tables
            .refresh_tokens
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.value().clone())
            .collect())
    }

    fn delete_wrappers_for_user(&self, user_id: i64) -> Result<usize, DbError> {
        let before = self.tables.refresh_tokens.len();
        self.tables
            .refresh_tokens
            .retain(|_, wrapper| wrapper.user_id != user_id);
        Ok(before.saturating_sub(self.tables.refresh_tokens.len()))
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DbError> {
        let before = self.tables.refresh_tokens.len();
        self.tables
            .refresh_tokens
            .retain(|_, wrapper| !wrapper.is_expired_at(now));
        Ok(before.saturating_sub(self.tables.refresh_tokens.len()))
    }
}
