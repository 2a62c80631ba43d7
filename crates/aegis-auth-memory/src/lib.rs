//! # aegis-auth-memory
//!
//! In-memory implementations of the `aegis-auth` storage traits, backed
//! by `RwLock<HashMap>`. Intended for tests and local development; data
//! does not survive a restart.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use aegis_auth::error::AuthError;
use aegis_auth::storage::{TokenRecordStorage, UserStorage};
use aegis_auth::types::{TokenRecord, User};
use aegis_auth::AuthResult;

fn poisoned<T>(_: PoisonError<T>) -> AuthError {
    AuthError::storage("storage lock poisoned")
}

/// In-memory token record storage.
#[derive(Default)]
pub struct InMemoryTokenRecordStorage {
    records: RwLock<HashMap<Uuid, TokenRecord>>,
}

impl InMemoryTokenRecordStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut TokenRecord)) -> AuthResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| AuthError::storage(format!("no token record with id {id}")))?;
        apply(record);
        Ok(())
    }
}

#[async_trait]
impl TokenRecordStorage for InMemoryTokenRecordStorage {
    async fn create(&self, record: &TokenRecord) -> AuthResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> AuthResult<Option<TokenRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&id).cloned())
    }

    async fn get_by_secret(&self, secret: &str) -> AuthResult<Option<TokenRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .find(|r| r.refresh_secret == secret)
            .cloned())
    }

    async fn get_by_subject(&self, subject: &str) -> AuthResult<Vec<TokenRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|r| r.subject == subject)
            .cloned()
            .collect())
    }

    async fn set_access_block(&self, id: Uuid, blocked: bool) -> AuthResult<()> {
        self.update(id, |r| r.is_blocked_access = blocked)
    }

    async fn set_full_block(&self, id: Uuid) -> AuthResult<()> {
        self.update(id, |r| {
            r.is_full_block = true;
            r.is_blocked_access = true;
        })
    }

    async fn mark_superseded(&self, id: Uuid) -> AuthResult<()> {
        self.update(id, |r| r.superseded = true)
    }

    async fn delete(&self, id: Uuid) -> AuthResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.remove(&id);
        Ok(())
    }

    async fn delete_by_subject(&self, subject: &str) -> AuthResult<u64> {
        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|_, r| r.subject != subject);
        Ok((before - records.len()) as u64)
    }
}

/// In-memory account storage.
#[derive(Default)]
pub struct InMemoryUserStorage {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(AuthError::storage("email or username already exists"));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().find(|u| u.username == username).cloned())
    }
}
