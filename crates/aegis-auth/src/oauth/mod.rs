//! Third-party OAuth authorization flows.
//!
//! This module provides:
//!
//! - CSRF-protecting flow-state tokens
//! - The per-provider descriptor registry
//! - The authorization-code flow coordinator

pub mod authorize;
pub mod provider;
pub mod state;

pub use authorize::{AuthorizationCoordinator, AuthorizationOutcome};
pub use provider::{
    IdentityMapping, IdentitySource, NormalizedIdentity, Provider, ProviderRegistry,
    ProviderToken, TokenRequestStyle,
};
pub use state::{FlowState, StateCodec};
