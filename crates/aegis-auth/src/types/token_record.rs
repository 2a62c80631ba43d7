//! Refresh-token ledger entry.
//!
//! Every issued token pair persists one record. Rotation never mutates a
//! record's secret in place: the old record is marked superseded and a new
//! record is created, so the ledger keeps one row per issuance.

use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Length of a generated refresh secret.
pub const REFRESH_SECRET_LEN: usize = 128;

/// A refresh-token ledger entry.
///
/// The record `id` doubles as the `jti` of the access token issued with
/// it, which is what makes revocation-by-subject able to blacklist the
/// matching access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Token identifier (the access token's `jti`). Primary key.
    pub id: Uuid,

    /// Identifier of the authenticated principal. Not unique: one subject
    /// holds one record per active session.
    pub subject: String,

    /// High-entropy opaque secret the client presents to redeem a new pair.
    pub refresh_secret: String,

    /// Issuance time, epoch seconds.
    pub issued_at: i64,

    /// Expiry horizon, epoch seconds. Always greater than `issued_at`.
    pub expires_at: i64,

    /// Soft block: access-token validation for this lineage is refused
    /// until the next successful refresh.
    pub is_blocked_access: bool,

    /// Full block: access is refused and the record can never be redeemed
    /// again. Implies `is_blocked_access`.
    pub is_full_block: bool,

    /// Set when a rotation has replaced this record; superseded secrets
    /// are no longer redeemable.
    pub superseded: bool,
}

impl TokenRecord {
    /// Creates a fresh, unblocked record.
    #[must_use]
    pub fn new(
        id: Uuid,
        subject: impl Into<String>,
        refresh_secret: impl Into<String>,
        issued_at: i64,
        expires_at: i64,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            refresh_secret: refresh_secret.into(),
            issued_at,
            expires_at,
            is_blocked_access: false,
            is_full_block: false,
            superseded: false,
        }
    }

    /// Returns `true` if the expiry horizon has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc().unix_timestamp()
    }

    /// Remaining lifetime until the expiry horizon.
    ///
    /// Returns `Duration::ZERO` for expired records.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Duration::from_secs(self.expires_at.saturating_sub(now).max(0) as u64)
    }

    /// Generates a new refresh secret: 128 alphanumeric characters drawn
    /// from the OS CSPRNG.
    #[must_use]
    pub fn generate_secret() -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(REFRESH_SECRET_LEN)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_in: i64) -> TokenRecord {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        TokenRecord::new(
            Uuid::new_v4(),
            "u1",
            TokenRecord::generate_secret(),
            now,
            now + expires_in,
        )
    }

    #[test]
    fn test_generate_secret_shape() {
        let secret = TokenRecord::generate_secret();
        assert_eq!(secret.len(), REFRESH_SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_secret_uniqueness() {
        let secrets: Vec<String> = (0..50).map(|_| TokenRecord::generate_secret()).collect();
        let mut unique = secrets.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(secrets.len(), unique.len());
    }

    #[test]
    fn test_is_expired() {
        assert!(!record(3600).is_expired());
        assert!(record(-60).is_expired());
    }

    #[test]
    fn test_remaining() {
        let rec = record(3600);
        let remaining = rec.remaining().as_secs();
        assert!((3598..=3600).contains(&remaining));

        assert_eq!(record(-60).remaining(), Duration::ZERO);
    }

    #[test]
    fn test_new_record_is_unblocked() {
        let rec = record(3600);
        assert!(!rec.is_blocked_access);
        assert!(!rec.is_full_block);
        assert!(!rec.superseded);
    }

    #[test]
    fn test_serialization_round_trip() {
        let rec = record(3600);
        let json = serde_json::to_string(&rec).unwrap();
        let back: TokenRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
