//! Token revocation and blacklist propagation.
//!
//! Revocation is checked by a single cache lookup on the hot validation
//! path; no database read happens there. The blacklist TTL equals the
//! access-token TTL: an access token can never outlive that window, so an
//! evicted entry can only correspond to a token that is already expired.
//!
//! # Failure semantics
//!
//! - Blacklist writes are fanned out concurrently and awaited; individual
//!   outcomes are collected and any failure is reported to the caller
//!   naming how many writes did not land.
//! - An unreachable cache during lookup is resolved by the configured
//!   policy: fail-open treats the token as not revoked, fail-closed treats
//!   it as revoked.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use uuid::Uuid;

use crate::AuthResult;
use crate::cache::CacheBackend;
use crate::error::AuthError;
use crate::storage::TokenRecordStorage;
use crate::types::TokenRecord;

/// Cache value stored under a blacklisted `jti`.
const BLOCKED: &str = "blocked";

/// Tracks which token identifiers are currently blocked.
pub struct RevocationStore {
    records: Arc<dyn TokenRecordStorage>,
    cache: CacheBackend,
    /// TTL of blacklist entries; aligned with the access-token TTL.
    blacklist_ttl: Duration,
    fail_closed: bool,
}

impl RevocationStore {
    /// Creates a new revocation store. `blacklist_ttl` must be the
    /// access-token TTL.
    #[must_use]
    pub fn new(
        records: Arc<dyn TokenRecordStorage>,
        cache: CacheBackend,
        blacklist_ttl: Duration,
    ) -> Self {
        Self {
            records,
            cache,
            blacklist_ttl,
            fail_closed: false,
        }
    }

    /// Sets the lookup policy for an unreachable cache.
    #[must_use]
    pub fn with_fail_closed(mut self, fail_closed: bool) -> Self {
        self.fail_closed = fail_closed;
        self
    }

    fn key(jti: &str) -> String {
        format!("revoked:{jti}")
    }

    /// Soft-blocks every record of a subject: current access tokens stop
    /// validating, refresh redemption stays possible and lifts the block.
    ///
    /// Returns the number of affected records.
    ///
    /// # Errors
    /// Returns an error if the record updates fail or any blacklist write
    /// does not land.
    pub async fn block_access(&self, subject: &str) -> AuthResult<u64> {
        let records = self.records.get_by_subject(subject).await?;
        for record in &records {
            self.records.set_access_block(record.id, true).await?;
        }
        self.blacklist(&records).await?;
        tracing::info!(subject = %subject, count = records.len(), "access blocked");
        Ok(records.len() as u64)
    }

    /// Fully blocks every record of a subject: access stops validating and
    /// refresh redemption is permanently refused. Only a new login issues
    /// tokens again.
    ///
    /// Returns the number of affected records.
    ///
    /// # Errors
    /// Returns an error if the record updates fail or any blacklist write
    /// does not land.
    pub async fn full_block(&self, subject: &str) -> AuthResult<u64> {
        let records = self.records.get_by_subject(subject).await?;
        for record in &records {
            self.records.set_full_block(record.id).await?;
        }
        self.blacklist(&records).await?;
        tracing::info!(subject = %subject, count = records.len(), "fully blocked");
        Ok(records.len() as u64)
    }

    /// Blacklists a single token identifier.
    ///
    /// # Errors
    /// Returns an error if the cache write fails.
    pub async fn blacklist_jti(&self, jti: Uuid) -> AuthResult<()> {
        let jti = jti.to_string();
        self.cache
            .set(&Self::key(&jti), BLOCKED, self.blacklist_ttl)
            .await
            .map_err(|e| AuthError::cache(e.to_string()))
    }

    /// Checks whether a token identifier is blacklisted.
    ///
    /// A cache miss means "not revoked". An unreachable cache resolves to
    /// the configured fail-open/fail-closed policy.
    pub async fn is_blacklisted(&self, jti: &str) -> bool {
        match self.cache.get(&Self::key(jti)).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    jti = %jti,
                    error = %e,
                    fail_closed = self.fail_closed,
                    "revocation cache unreachable"
                );
                self.fail_closed
            }
        }
    }

    /// Writes one blacklist entry per record, fanned out concurrently.
    /// All writes settle before the outcome is reported.
    async fn blacklist(&self, records: &[TokenRecord]) -> AuthResult<()> {
        let writes = records.iter().map(|record| {
            let key = Self::key(&record.id.to_string());
            async move {
                let outcome = self.cache.set(&key, BLOCKED, self.blacklist_ttl).await;
                (record.id, outcome)
            }
        });

        let mut failed = 0usize;
        for (id, outcome) in join_all(writes).await {
            if let Err(e) = outcome {
                failed += 1;
                tracing::warn!(jti = %id, error = %e, "blacklist write failed");
            }
        }

        if failed > 0 {
            return Err(AuthError::cache(format!(
                "{failed} of {} blacklist writes failed",
                records.len()
            )));
        }
        Ok(())
    }
}
