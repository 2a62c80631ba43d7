//! JWT encoding, decoding, and signing key management.
//!
//! Tokens are signed with an asymmetric scheme so that validation-only
//! components never hold the private key. RS256 and RS384 are supported;
//! key material is loaded from PEM files at startup and key-loading
//! failure is fatal (no key, no service).
//!
//! ## Example
//!
//! ```ignore
//! use aegis_auth::token::jwt::{JwtService, SigningAlgorithm, SigningKeyPair};
//!
//! let key_pair = SigningKeyPair::from_pem_files(
//!     SigningAlgorithm::RS256,
//!     "keys/private.pem",
//!     "keys/public.pem",
//! )?;
//! let jwt = JwtService::new(key_pair);
//!
//! let token = jwt.encode(&claims)?;
//! let decoded: TokenClaims = jwt.decode(&token)?;
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AuthError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// Key material could not be read from disk.
    #[error("Unreadable key file {path}: {message}")]
    KeyFile {
        /// Path of the key file that failed to load.
        path: String,
        /// Description of the I/O failure.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error (expired, bad signature).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Expired | Self::InvalidSignature)
    }

    /// Returns `true` if this is a key-related error.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGenerationError { .. } | Self::InvalidKey { .. } | Self::KeyFile { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::TokenExpired,
            JwtError::InvalidSignature => Self::SignatureInvalid,
            JwtError::DecodingError { message } => Self::TokenMalformed { message },
            JwtError::EncodingError { message } => Self::Internal { message },
            key_err => Self::Configuration {
                message: key_err.to_string(),
            },
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256 (the default).
    RS256,
    /// RSA with SHA-384.
    RS384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
        }
    }

    /// Parses an algorithm identifier from configuration.
    ///
    /// # Errors
    /// Returns an error for unknown identifiers.
    pub fn parse(value: &str) -> Result<Self, JwtError> {
        match value {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            other => Err(JwtError::invalid_key(format!(
                "Unsupported signing algorithm: {other}"
            ))),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Discriminator for the two token shapes the engine signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenUse {
    /// A short-lived access token carrying identity claims.
    #[serde(rename = "access")]
    Access,
    /// A CSRF-protecting OAuth flow-state token.
    #[serde(rename = "flow-state")]
    FlowState,
}

impl TokenUse {
    /// Returns the token use as the wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::FlowState => "flow-state",
        }
    }
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity claims describing an authenticated subject.
///
/// This is the projection of a local account that travels inside access
/// tokens; it carries no housekeeping claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectClaims {
    /// Identifier of the authenticated principal.
    pub sub: String,

    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Account email.
    pub email: String,

    /// Account username.
    pub username: String,

    /// Given name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Family name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Full access-token payload: subject claims plus housekeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identifier of the authenticated principal.
    pub sub: String,

    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Account email.
    pub email: String,

    /// Account username.
    pub username: String,

    /// Given name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Family name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Token shape discriminator.
    #[serde(rename = "type")]
    pub token_use: TokenUse,

    /// Token identifier; keys the revocation blacklist and ties the
    /// access token to its refresh record.
    pub jti: String,
}

impl TokenClaims {
    /// Builds access-token claims for a subject, stamping `iat`/`exp`
    /// relative to the current time.
    #[must_use]
    pub fn new_access(subject: &SubjectClaims, jti: Uuid, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            sub: subject.sub.clone(),
            scopes: subject.scopes.clone(),
            email: subject.email.clone(),
            username: subject.username.clone(),
            first_name: subject.first_name.clone(),
            last_name: subject.last_name.clone(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            token_use: TokenUse::Access,
            jti: jti.to_string(),
        }
    }
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// An asymmetric signing key pair.
///
/// The private (encoding) half signs tokens; the public (decoding) half
/// verifies them.
pub struct SigningKeyPair {
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Encoding key (private key) for signing.
    encoding_key: EncodingKey,

    /// Decoding key (public key) for verification.
    decoding_key: DecodingKey,
}

impl SigningKeyPair {
    /// Generates a fresh RSA key pair. Intended for tests and local
    /// development; production deployments load PEM files instead.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate_rsa(algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        let bits = 2048;
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Self::from_pem(algorithm, &private_pem, &public_pem)
    }

    /// Loads a key pair from PEM strings.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
        })
    }

    /// Loads a key pair from PEM files on disk.
    ///
    /// Missing or unreadable key material is a startup-fatal condition;
    /// the caller is expected to abort, not retry.
    ///
    /// # Errors
    /// Returns an error if either file cannot be read or parsed.
    pub fn from_pem_files(
        algorithm: SigningAlgorithm,
        private_path: impl AsRef<Path>,
        public_path: impl AsRef<Path>,
    ) -> Result<Self, JwtError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| JwtError::KeyFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        };
        let private_pem = read(private_path.as_ref())?;
        let public_pem = read(public_path.as_ref())?;
        Self::from_pem(algorithm, &private_pem, &public_pem)
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding signed tokens.
///
/// Thread-safe (`Send + Sync`); shared across async tasks behind an `Arc`.
pub struct JwtService {
    signing_key: SigningKeyPair,
}

impl JwtService {
    /// Creates a new JWT service around a key pair.
    #[must_use]
    pub fn new(signing_key: SigningKeyPair) -> Self {
        Self { signing_key }
    }

    /// Encodes claims into a compact signed string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let header = Header::new(self.signing_key.algorithm.to_jwt_algorithm());
        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes a token, verifying signature and expiry.
    ///
    /// Expiry is checked independently of signature validity and reported
    /// as [`JwtError::Expired`], a distinct failure from a bad signature.
    ///
    /// # Errors
    /// Returns an error if decoding or validation fails.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(self.signing_key.algorithm.to_jwt_algorithm());
        validation.validate_exp = true;
        validation.validate_aud = false;

        decode(token, &self.signing_key.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Decodes a token without verifying its signature.
    ///
    /// Only for trusted internal reads where the payload's authenticity was
    /// already established by other means. Expiry is still enforced.
    ///
    /// # Errors
    /// Returns an error if the token is malformed or expired.
    pub fn decode_unverified<T: DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(self.signing_key.algorithm.to_jwt_algorithm());
        validation.insecure_disable_signature_validation();
        validation.validate_exp = true;
        validation.validate_aud = false;

        decode(token, &self.signing_key.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }
}

// ============================================================================
// Tests
// ============================================================================
