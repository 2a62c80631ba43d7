//! Authentication error types.
//!
//! This module defines all request-level failures the token and OAuth
//! engine can surface. Every variant is recoverable from the caller's
//! point of view; the only fatal condition in the crate is signing-key
//! loading at startup, which is reported through the codec constructor
//! and expected to abort process startup.

use std::fmt;

/// Errors that can occur during token and OAuth operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The presented email/password pair does not match a known account.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The access token's `exp` claim has passed.
    #[error("Token expired")]
    TokenExpired,

    /// The token could not be parsed or carries unusable claims.
    #[error("Malformed token: {message}")]
    TokenMalformed {
        /// Description of what was wrong with the token.
        message: String,
    },

    /// The token signature does not verify against the public key.
    #[error("Invalid token signature")]
    SignatureInvalid,

    /// The token's identifier is present in the revocation blacklist.
    #[error("Token revoked")]
    TokenRevoked,

    /// No refresh record matches the presented secret, or the record was
    /// superseded by a rotation.
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// The refresh record's expiry horizon has passed.
    #[error("Refresh token expired")]
    ExpiredRefreshToken,

    /// The refresh record is fully blocked and can never be redeemed again.
    #[error("Refresh token revoked")]
    RevokedRefreshToken,

    /// The OAuth flow-state token failed decoding or expiry verification.
    #[error("Invalid flow state: {message}")]
    InvalidState {
        /// Description of why the state was rejected.
        message: String,
    },

    /// The requested provider name is not registered or not enabled.
    #[error("Unknown or disabled provider: {service}")]
    InvalidService {
        /// The provider name that failed the lookup.
        service: String,
    },

    /// The provider's token or user-info endpoint rejected our request.
    #[error("Provider exchange failed: {provider} - {message}")]
    ProviderExchangeFailed {
        /// The provider the exchange was attempted against.
        provider: String,
        /// Description of the failure.
        message: String,
    },

    /// No usable email address could be obtained from the provider.
    #[error("No usable email from provider: {provider}")]
    MissingEmail {
        /// The provider whose identity lacked an email.
        provider: String,
    },

    /// An account with the same email or username already exists.
    #[error("Email or username already registered")]
    DuplicateIdentity,

    /// An error occurred while reading or writing persisted records.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The revocation cache could not complete an operation.
    #[error("Cache error: {message}")]
    Cache {
        /// Description of the cache error.
        message: String,
    },

    /// The engine configuration is invalid or key material is unusable.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `TokenMalformed` error.
    #[must_use]
    pub fn token_malformed(message: impl Into<String>) -> Self {
        Self::TokenMalformed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidState` error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidService` error.
    #[must_use]
    pub fn invalid_service(service: impl Into<String>) -> Self {
        Self::InvalidService {
            service: service.into(),
        }
    }

    /// Creates a new `ProviderExchangeFailed` error.
    #[must_use]
    pub fn provider_exchange_failed(
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderExchangeFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `MissingEmail` error.
    #[must_use]
    pub fn missing_email(provider: impl Into<String>) -> Self {
        Self::MissingEmail {
            provider: provider.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Cache` error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is caused by the caller's request
    /// (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server-side error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Cache { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is an access-token validation error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired
                | Self::TokenMalformed { .. }
                | Self::SignatureInvalid
                | Self::TokenRevoked
        )
    }

    /// Returns `true` if this is a refresh-redemption error.
    #[must_use]
    pub fn is_refresh_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRefreshToken | Self::ExpiredRefreshToken | Self::RevokedRefreshToken
        )
    }

    /// Returns `true` if this error originated in the third-party
    /// authorization flow.
    #[must_use]
    pub fn is_oauth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. }
                | Self::InvalidService { .. }
                | Self::ProviderExchangeFailed { .. }
                | Self::MissingEmail { .. }
                | Self::DuplicateIdentity
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::TokenExpired
            | Self::TokenMalformed { .. }
            | Self::SignatureInvalid
            | Self::TokenRevoked => ErrorCategory::Token,
            Self::InvalidRefreshToken
            | Self::ExpiredRefreshToken
            | Self::RevokedRefreshToken => ErrorCategory::Refresh,
            Self::InvalidState { .. }
            | Self::InvalidService { .. }
            | Self::ProviderExchangeFailed { .. }
            | Self::MissingEmail { .. }
            | Self::DuplicateIdentity => ErrorCategory::OAuth,
            Self::Storage { .. } | Self::Cache { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential verification errors.
    Authentication,
    /// Access-token validation errors.
    Token,
    /// Refresh-redemption errors.
    Refresh,
    /// Third-party authorization flow errors.
    OAuth,
    /// Storage/cache errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Refresh => write!(f, "refresh"),
            Self::OAuth => write!(f, "oauth"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
