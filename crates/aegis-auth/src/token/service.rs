//! Token issuance, refresh rotation, and validation.
//!
//! Issuance produces an access/refresh pair and persists the refresh
//! record before the pair is returned; a persistence failure is a hard
//! failure of issuance. Rotation redeems a refresh secret for a brand-new
//! pair that keeps the original expiry horizon, so a session's total
//! lifetime is never extended by rotating. Validation is a decode plus a
//! single blacklist lookup; it performs no database access.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::TokenRecordStorage;
use crate::token::jwt::{JwtService, SubjectClaims, TokenClaims, TokenUse};
use crate::token::revocation::RevocationStore;
use crate::types::TokenRecord;

/// An issued access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    /// Compact signed access token.
    pub access_token: String,

    /// Opaque refresh secret.
    pub refresh_token: String,

    /// Always "Bearer".
    pub token_type: String,
}

impl TokenPair {
    fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// Issues, rotates, validates, and revokes token pairs.
pub struct TokenService {
    jwt: Arc<JwtService>,
    records: Arc<dyn TokenRecordStorage>,
    revocation: Arc<RevocationStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        jwt: Arc<JwtService>,
        records: Arc<dyn TokenRecordStorage>,
        revocation: Arc<RevocationStore>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            jwt,
            records,
            revocation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issues a fresh token pair for an authenticated subject.
    ///
    /// The refresh record is persisted before the pair is returned; an
    /// access token without a backing record would break revocation
    /// lookups for its refresh lineage.
    ///
    /// # Errors
    /// Returns an error if encoding or record persistence fails.
    pub async fn issue(&self, subject: &SubjectClaims) -> AuthResult<TokenPair> {
        self.issue_with_horizon(subject, self.refresh_ttl).await
    }

    /// Exchanges a valid refresh secret for a new pair.
    ///
    /// The new pair inherits the remaining horizon of the redeemed record
    /// rather than a full refresh TTL. A soft access block on the record
    /// is lifted by successful redemption; a full block refuses redemption
    /// outright. The redeemed record is marked superseded, so its secret
    /// cannot be redeemed a second time.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRefreshToken`] if no record matches the
    ///   secret, or the record was already superseded
    /// - [`AuthError::ExpiredRefreshToken`] if the horizon has passed
    /// - [`AuthError::RevokedRefreshToken`] if the record is fully blocked
    pub async fn rotate(
        &self,
        refresh_secret: &str,
        subject: &SubjectClaims,
    ) -> AuthResult<TokenPair> {
        let record = self
            .records
            .get_by_secret(refresh_secret)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if record.superseded {
            return Err(AuthError::InvalidRefreshToken);
        }
        if record.is_expired() {
            return Err(AuthError::ExpiredRefreshToken);
        }
        if record.is_full_block {
            return Err(AuthError::RevokedRefreshToken);
        }

        // A soft block is temporary: redemption lifts it.
        if record.is_blocked_access {
            self.records.set_access_block(record.id, false).await?;
        }

        self.records.mark_superseded(record.id).await?;

        let pair = self.issue_with_horizon(subject, record.remaining()).await?;
        tracing::debug!(
            subject = %subject.sub,
            rotated_from = %record.id,
            "refresh rotated"
        );
        Ok(pair)
    }

    /// Checks a presented access token: signature, expiry, and revocation.
    ///
    /// No database access happens on this path.
    pub async fn validate(&self, access_token: &str) -> bool {
        self.introspect(access_token).await.is_ok()
    }

    /// Performs the same checks as [`validate`](Self::validate) but
    /// returns the decoded payload.
    ///
    /// # Errors
    /// Returns the precise validation failure: expired, malformed, bad
    /// signature, or revoked.
    pub async fn introspect(&self, access_token: &str) -> AuthResult<TokenClaims> {
        let claims: TokenClaims = self.jwt.decode(access_token)?;
        if claims.token_use != TokenUse::Access {
            return Err(AuthError::token_malformed("not an access token"));
        }
        if self.revocation.is_blacklisted(&claims.jti).await {
            return Err(AuthError::TokenRevoked);
        }
        Ok(claims)
    }

    /// Soft-blocks every outstanding token of a subject. Access tokens
    /// stop validating; the next successful refresh lifts the block.
    ///
    /// # Errors
    /// Returns an error if record updates or blacklist writes fail.
    pub async fn revoke_access(&self, subject: &str) -> AuthResult<u64> {
        self.revocation.block_access(subject).await
    }

    /// Fully revokes a subject: access stops validating and every refresh
    /// secret is permanently refused. Only a new login issues tokens again.
    ///
    /// # Errors
    /// Returns an error if record updates or blacklist writes fail.
    pub async fn revoke_all(&self, subject: &str) -> AuthResult<u64> {
        self.revocation.full_block(subject).await
    }

    /// Issues a pair whose refresh record expires `horizon` from now.
    async fn issue_with_horizon(
        &self,
        subject: &SubjectClaims,
        horizon: Duration,
    ) -> AuthResult<TokenPair> {
        let jti = Uuid::new_v4();
        let claims = TokenClaims::new_access(subject, jti, self.access_ttl);
        let access_token = self.jwt.encode(&claims)?;

        let refresh_secret = TokenRecord::generate_secret();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let record = TokenRecord::new(
            jti,
            subject.sub.clone(),
            refresh_secret.clone(),
            now,
            now + horizon.as_secs() as i64,
        );
        self.records.create(&record).await?;

        tracing::debug!(subject = %subject.sub, jti = %jti, "issued token pair");
        Ok(TokenPair::new(access_token, refresh_secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;
    use crate::storage::testing::MemoryRecords;
    use crate::token::jwt::{SigningAlgorithm, SigningKeyPair};

    fn subject() -> SubjectClaims {
        SubjectClaims {
            sub: "u1".to_string(),
            scopes: vec!["profile".to_string()],
            email: "u1@example.com".to_string(),
            username: "u1".to_string(),
            first_name: None,
            last_name: None,
        }
    }

    fn service() -> (TokenService, Arc<MemoryRecords>) {
        let access_ttl = Duration::from_secs(60);
        let refresh_ttl = Duration::from_secs(3600);
        let records = Arc::new(MemoryRecords::new());
        let jwt = Arc::new(JwtService::new(
            SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap(),
        ));
        let revocation = Arc::new(RevocationStore::new(
            records.clone(),
            CacheBackend::new_local(),
            access_ttl,
        ));
        (
            TokenService::new(jwt, records.clone(), revocation, access_ttl, refresh_ttl),
            records,
        )
    }

    #[tokio::test]
    async fn test_issued_token_validates_immediately() {
        let (service, _) = service();
        let pair = service.issue(&subject()).await.unwrap();

        assert!(service.validate(&pair.access_token).await);
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.refresh_token.len(), 128);
    }

    #[tokio::test]
    async fn test_issue_persists_backing_record() {
        let (service, records) = service();
        let pair = service.issue(&subject()).await.unwrap();

        let claims = service.introspect(&pair.access_token).await.unwrap();
        let jti = Uuid::parse_str(&claims.jti).unwrap();
        let record = records.get_by_id(jti).await.unwrap().unwrap();

        assert_eq!(record.subject, "u1");
        assert_eq!(record.refresh_secret, pair.refresh_token);
        assert!(record.expires_at > record.issued_at);
    }

    #[tokio::test]
    async fn test_rotate_issues_new_pair() {
        let (service, _) = service();
        let p1 = service.issue(&subject()).await.unwrap();
        let p2 = service.rotate(&p1.refresh_token, &subject()).await.unwrap();

        assert_ne!(p1.access_token, p2.access_token);
        assert_ne!(p1.refresh_token, p2.refresh_token);
        assert!(service.validate(&p2.access_token).await);
    }

    #[tokio::test]
    async fn test_rotate_preserves_horizon() {
        let (service, records) = service();
        let p1 = service.issue(&subject()).await.unwrap();
        let original = records
            .get_by_secret(&p1.refresh_token)
            .await
            .unwrap()
            .unwrap();

        let p2 = service.rotate(&p1.refresh_token, &subject()).await.unwrap();
        let rotated = records
            .get_by_secret(&p2.refresh_token)
            .await
            .unwrap()
            .unwrap();

        // Second-level rounding: rotation happens within the same second
        // or the one after.
        assert!((rotated.expires_at - original.expires_at).abs() <= 1);
    }

    #[tokio::test]
    async fn test_rotated_away_secret_is_not_redeemable() {
        let (service, _) = service();
        let p1 = service.issue(&subject()).await.unwrap();
        service.rotate(&p1.refresh_token, &subject()).await.unwrap();

        let result = service.rotate(&p1.refresh_token, &subject()).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn test_rotate_unknown_secret() {
        let (service, _) = service();
        let result = service.rotate("no-such-secret", &subject()).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn test_rotate_expired_record() {
        let (service, records) = service();
        let p1 = service.issue(&subject()).await.unwrap();
        records.expire_secret(&p1.refresh_token);

        let result = service.rotate(&p1.refresh_token, &subject()).await;
        assert!(matches!(result, Err(AuthError::ExpiredRefreshToken)));
    }

    #[tokio::test]
    async fn test_block_access_invalidates_then_refresh_lifts() {
        let (service, records) = service();
        let pair = service.issue(&subject()).await.unwrap();

        service.revoke_access("u1").await.unwrap();
        assert!(!service.validate(&pair.access_token).await);

        // Refresh eligibility is unaffected; redemption clears the block.
        let p2 = service.rotate(&pair.refresh_token, &subject()).await.unwrap();
        assert!(service.validate(&p2.access_token).await);

        let old = records
            .get_by_secret(&pair.refresh_token)
            .await
            .unwrap()
            .unwrap();
        assert!(!old.is_blocked_access);
        assert!(old.superseded);
    }

    #[tokio::test]
    async fn test_full_block_refuses_refresh() {
        let (service, _) = service();
        let pair = service.issue(&subject()).await.unwrap();

        service.revoke_all("u1").await.unwrap();

        assert!(!service.validate(&pair.access_token).await);
        let result = service.rotate(&pair.refresh_token, &subject()).await;
        assert!(matches!(result, Err(AuthError::RevokedRefreshToken)));
    }

    #[tokio::test]
    async fn test_full_block_covers_every_session() {
        let (service, _) = service();
        let s1 = service.issue(&subject()).await.unwrap();
        let s2 = service.issue(&subject()).await.unwrap();

        service.revoke_all("u1").await.unwrap();

        for pair in [&s1, &s2] {
            assert!(!service.validate(&pair.access_token).await);
            assert!(matches!(
                service.rotate(&pair.refresh_token, &subject()).await,
                Err(AuthError::RevokedRefreshToken)
            ));
        }
    }

    #[tokio::test]
    async fn test_introspect_returns_claims() {
        let (service, _) = service();
        let pair = service.issue(&subject()).await.unwrap();

        let claims = service.introspect(&pair.access_token).await.unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "u1@example.com");
        assert_eq!(claims.token_use, TokenUse::Access);
    }

    #[tokio::test]
    async fn test_introspect_rejects_revoked() {
        let (service, _) = service();
        let pair = service.issue(&subject()).await.unwrap();
        service.revoke_access("u1").await.unwrap();

        let result = service.introspect(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_validate_rejects_garbage() {
        let (service, _) = service();
        assert!(!service.validate("garbage").await);
    }
}
