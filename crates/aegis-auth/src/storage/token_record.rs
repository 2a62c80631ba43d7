//! Refresh-token record storage trait.
//!
//! # Security Considerations
//!
//! - Secret lookups must be exact-match on the full 128-character value
//! - Block flags must be visible to readers as soon as the mutating call
//!   returns
//! - Expired records should be garbage-collected externally; the engine
//!   only ever deletes explicitly

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::TokenRecord;

/// Storage trait for refresh-token ledger entries.
///
/// # Example Implementation
///
/// ```ignore
/// use aegis_auth::storage::TokenRecordStorage;
/// use aegis_auth::types::TokenRecord;
/// use aegis_auth::AuthResult;
///
/// struct InMemoryTokenRecordStorage {
///     records: std::sync::RwLock<std::collections::HashMap<uuid::Uuid, TokenRecord>>,
/// }
///
/// #[async_trait::async_trait]
/// impl TokenRecordStorage for InMemoryTokenRecordStorage {
///     async fn create(&self, record: &TokenRecord) -> AuthResult<()> {
///         let mut records = self.records.write().unwrap();
///         records.insert(record.id, record.clone());
///         Ok(())
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait TokenRecordStorage: Send + Sync {
    /// Persists a new record.
    ///
    /// # Errors
    /// Returns an error if the record cannot be stored. Callers treat this
    /// as a hard failure of issuance.
    async fn create(&self, record: &TokenRecord) -> AuthResult<()>;

    /// Finds a record by its identifier.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn get_by_id(&self, id: Uuid) -> AuthResult<Option<TokenRecord>>;

    /// Finds a record by its refresh secret.
    ///
    /// Returns records regardless of block/superseded status; callers
    /// check the flags.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn get_by_secret(&self, secret: &str) -> AuthResult<Option<TokenRecord>>;

    /// Lists every record belonging to a subject.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn get_by_subject(&self, subject: &str) -> AuthResult<Vec<TokenRecord>>;

    /// Sets or clears the soft access block on a record.
    ///
    /// # Errors
    /// Returns an error if the record is not found or the update fails.
    async fn set_access_block(&self, id: Uuid, blocked: bool) -> AuthResult<()>;

    /// Fully blocks a record: sets both the access block and the full
    /// block, permanently refusing further redemption.
    ///
    /// # Errors
    /// Returns an error if the record is not found or the update fails.
    async fn set_full_block(&self, id: Uuid) -> AuthResult<()>;

    /// Marks a record as superseded by a rotation.
    ///
    /// # Errors
    /// Returns an error if the record is not found or the update fails.
    async fn mark_superseded(&self, id: Uuid) -> AuthResult<()>;

    /// Deletes a record.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    async fn delete(&self, id: Uuid) -> AuthResult<()>;

    /// Deletes every record belonging to a subject.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    async fn delete_by_subject(&self, subject: &str) -> AuthResult<u64>;
}
