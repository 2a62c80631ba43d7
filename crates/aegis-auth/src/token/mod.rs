//! Token issuance, validation, and revocation.
//!
//! This module provides:
//!
//! - JWT encoding/decoding over an asymmetric key pair
//! - Access/refresh pair issuance and refresh rotation
//! - Revocation with cache-backed blacklist propagation

pub mod jwt;
pub mod revocation;
pub mod service;

pub use jwt::{
    JwtError, JwtService, SigningAlgorithm, SigningKeyPair, SubjectClaims, TokenClaims, TokenUse,
};
pub use revocation::RevocationStore;
pub use service::{TokenPair, TokenService};
