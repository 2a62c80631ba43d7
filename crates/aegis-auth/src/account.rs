//! Password login and registration.
//!
//! Password hashing sits behind a narrow capability trait so the engine
//! never sees more than `hash` and `verify`; the bundled implementation
//! uses Argon2id with PHC-formatted digests.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordVerifier, SaltString};
use argon2::PasswordHasher as _;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{TokenRecordStorage, UserStorage};
use crate::token::service::{TokenPair, TokenService};
use crate::types::User;

/// Password hashing capability.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a password into a storable digest.
    ///
    /// # Errors
    /// Returns an error if hashing fails (rare).
    fn hash(&self, password: &str) -> AuthResult<String>;

    /// Verifies a password against a stored digest.
    fn verify(&self, password: &str, digest: &str) -> bool;
}

/// Argon2id implementation of [`PasswordHasher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// A registration request.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Email address.
    pub email: String,

    /// Username.
    pub username: String,

    /// Plaintext password; hashed before storage.
    pub password: String,

    /// Given name, if provided.
    pub first_name: Option<String>,

    /// Family name, if provided.
    pub last_name: Option<String>,
}

/// Login, registration, and refresh-redemption entry points.
pub struct AccountService {
    users: Arc<dyn UserStorage>,
    records: Arc<dyn TokenRecordStorage>,
    tokens: Arc<TokenService>,
    passwords: Arc<dyn PasswordHasher>,
}

impl AccountService {
    /// Creates a new account service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStorage>,
        records: Arc<dyn TokenRecordStorage>,
        tokens: Arc<TokenService>,
        passwords: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            records,
            tokens,
            passwords,
        }
    }

    /// Authenticates an email/password pair and issues a token pair.
    ///
    /// Unknown emails, password-less (provider-provisioned) accounts, and
    /// wrong passwords all surface the same
    /// [`AuthError::InvalidCredentials`].
    ///
    /// # Errors
    /// Returns an error if credentials are invalid or issuance fails.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let digest = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !self.passwords.verify(password, digest) {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::debug!(subject = %user.id, "login succeeded");
        self.tokens.issue(&user.subject_claims()).await
    }

    /// Registers a new password account.
    ///
    /// # Errors
    /// Returns [`AuthError::DuplicateIdentity`] if the email or username
    /// is already taken.
    pub async fn register(&self, new: NewAccount) -> AuthResult<User> {
        if self.users.get_by_email(&new.email).await?.is_some()
            || self.users.get_by_username(&new.username).await?.is_some()
        {
            return Err(AuthError::DuplicateIdentity);
        }

        let mut user = User::new(new.email, new.username);
        user.first_name = new.first_name;
        user.last_name = new.last_name;
        user.password_hash = Some(self.passwords.hash(&new.password)?);

        self.users.create(&user).await?;
        tracing::info!(subject = %user.id, "account registered");
        Ok(user)
    }

    /// Redeems a refresh secret for a new pair on behalf of its subject.
    ///
    /// Looks up the record's subject and rebuilds the identity claims
    /// from the current account state, so a refreshed access token
    /// reflects profile changes made since the last issuance.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidRefreshToken`] if the secret or its
    /// subject cannot be resolved, plus any rotation failure.
    pub async fn refresh(&self, refresh_secret: &str) -> AuthResult<TokenPair> {
        let record = self
            .records
            .get_by_secret(refresh_secret)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;
        let subject =
            Uuid::parse_str(&record.subject).map_err(|_| AuthError::InvalidRefreshToken)?;
        let user = self
            .users
            .get_by_id(subject)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        self.tokens
            .rotate(refresh_secret, &user.subject_claims())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::CacheBackend;
    use crate::storage::testing::MemoryRecords;
    use crate::token::jwt::{JwtService, SigningAlgorithm, SigningKeyPair};
    use crate::token::revocation::RevocationStore;

    struct MemoryUsers {
        users: RwLock<HashMap<Uuid, User>>,
    }

    #[async_trait]
    impl UserStorage for MemoryUsers {
        async fn create(&self, user: &User) -> AuthResult<()> {
            self.users.write().unwrap().insert(user.id, user.clone());
            Ok(())
        }

        async fn get_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
            Ok(self.users.read().unwrap().get(&id).cloned())
        }

        async fn get_by_email(&self, email: &str) -> AuthResult<Option<User>> {
            Ok(self
                .users
                .read()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn get_by_username(&self, username: &str) -> AuthResult<Option<User>> {
            Ok(self
                .users
                .read()
                .unwrap()
                .values()
                .find(|u| u.username == username)
                .cloned())
        }
    }

    fn service() -> AccountService {
        let jwt = Arc::new(JwtService::new(
            SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap(),
        ));
        let records = Arc::new(MemoryRecords::new());
        let revocation = Arc::new(RevocationStore::new(
            records.clone(),
            CacheBackend::new_local(),
            Duration::from_secs(60),
        ));
        let tokens = Arc::new(TokenService::new(
            jwt,
            records.clone(),
            revocation,
            Duration::from_secs(60),
            Duration::from_secs(3600),
        ));
        AccountService::new(
            Arc::new(MemoryUsers {
                users: RwLock::new(HashMap::new()),
            }),
            records,
            tokens,
            Arc::new(Argon2PasswordHasher),
        )
    }

    fn new_account() -> NewAccount {
        NewAccount {
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            password: "correct horse battery staple".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
        }
    }

    #[test]
    fn test_argon2_round_trip() {
        let hasher = Argon2PasswordHasher;
        let digest = hasher.hash("hunter2").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("hunter2", &digest));
        assert!(!hasher.verify("hunter3", &digest));
        assert!(!hasher.verify("hunter2", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let user = service.register(new_account()).await.unwrap();
        assert!(user.password_hash.is_some());

        let pair = service
            .login("a@example.com", "correct horse battery staple")
            .await
            .unwrap();
        assert!(!pair.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = service();
        service.register(new_account()).await.unwrap();

        let result = service.login("a@example.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let service = service();
        let result = service.login("nobody@example.com", "pw").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_provider_account_has_no_password() {
        let service = service();
        let user = User::new("oauth@example.com", "oauthonly");
        service.users.create(&user).await.unwrap();

        let result = service.login("oauth@example.com", "anything").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = service();
        service.register(new_account()).await.unwrap();

        let mut dup = new_account();
        dup.username = "alice2".to_string();
        let result = service.register(dup).await;
        assert!(matches!(result, Err(AuthError::DuplicateIdentity)));
    }

    #[tokio::test]
    async fn test_refresh_resolves_subject() {
        let service = service();
        service.register(new_account()).await.unwrap();
        let pair = service
            .login("a@example.com", "correct horse battery staple")
            .await
            .unwrap();

        let rotated = service.refresh(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn test_refresh_unknown_secret() {
        let service = service();
        let result = service.refresh("no-such-secret").await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }
}
