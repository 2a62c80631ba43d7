//! # aegis-auth
//!
//! Token and OAuth session engine for the Aegis identity service.
//!
//! This crate provides:
//! - Asymmetric access/refresh token issuance and validation
//! - Refresh rotation with a bounded session horizon
//! - Revocation with cache-backed blacklist propagation
//! - A provider-polymorphic authorization-code coordinator
//! - Password login and registration
//!
//! ## Overview
//!
//! Login and OAuth flows both terminate at the token service, producing
//! an access/refresh pair; subsequent requests flow through validation;
//! logout and administrative actions flow through the revocation store.
//! Storage is consumed through traits only; backends live in separate
//! crates (`aegis-auth-memory` for tests and local development).
//!
//! ## Modules
//!
//! - [`account`] - Password login, registration, refresh redemption
//! - [`cache`] - TTL cache backend for the revocation blacklist
//! - [`config`] - Engine configuration
//! - [`error`] - Error taxonomy
//! - [`oauth`] - Flow state, provider registry, authorization coordinator
//! - [`storage`] - Storage traits for records and accounts
//! - [`token`] - JWT codec, issuance, rotation, validation, revocation
//! - [`types`] - Domain types

pub mod account;
pub mod cache;
pub mod config;
pub mod error;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use account::{AccountService, Argon2PasswordHasher, NewAccount, PasswordHasher};
pub use cache::{CacheBackend, CacheError};
pub use config::{AuthConfig, CacheConfig, ConfigError, ProviderCredentials, TokenConfig};
pub use error::{AuthError, ErrorCategory};
pub use oauth::{
    AuthorizationCoordinator, AuthorizationOutcome, FlowState, NormalizedIdentity, Provider,
    ProviderRegistry, ProviderToken, StateCodec,
};
pub use storage::{TokenRecordStorage, UserStorage};
pub use token::{
    JwtError, JwtService, RevocationStore, SigningAlgorithm, SigningKeyPair, SubjectClaims,
    TokenClaims, TokenPair, TokenService, TokenUse,
};
pub use types::{TokenRecord, User};

/// Type alias for engine results.
pub type AuthResult<T> = Result<T, AuthError>;
