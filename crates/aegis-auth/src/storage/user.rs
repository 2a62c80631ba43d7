//! Account storage trait.
//!
//! A collaborator interface: the engine consumes it from the account
//! service and the authorization coordinator but never implements it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::User;

/// Storage trait for local accounts.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Persists a new account.
    ///
    /// # Errors
    /// Returns an error if the account cannot be stored (e.g., unique
    /// constraint violation, storage unavailable).
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Finds an account by identifier.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn get_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Finds an account by email.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn get_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Finds an account by username.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn get_by_username(&self, username: &str) -> AuthResult<Option<User>>;
}
