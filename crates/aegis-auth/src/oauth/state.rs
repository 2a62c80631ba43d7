//! CSRF-protecting flow-state tokens.
//!
//! The state parameter carried across the authorization redirect round
//! trip is a short-lived signed token holding the provider name and the
//! post-login redirect target. It reuses the access-token signing
//! mechanism and TTL rather than introducing a separate format.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::jwt::{JwtService, TokenUse};

/// The parsed contents of a flow-state token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowState {
    /// Provider name the flow was started for.
    pub service: String,

    /// Where to send the user (with their tokens) after completion.
    pub redirect_url: String,
}

/// Wire shape of a flow-state token.
#[derive(Debug, Serialize, Deserialize)]
struct FlowStateClaims {
    service: String,
    redirect_url: String,
    iat: i64,
    exp: i64,
    #[serde(rename = "type")]
    token_use: TokenUse,
    jti: String,
}

/// Builds and parses flow-state tokens.
pub struct StateCodec {
    jwt: Arc<JwtService>,
    ttl: Duration,
}

impl StateCodec {
    /// Creates a new state codec. `ttl` is the access-token TTL.
    #[must_use]
    pub fn new(jwt: Arc<JwtService>, ttl: Duration) -> Self {
        Self { jwt, ttl }
    }

    /// Builds a signed state token for a provider flow.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn build_state(&self, service: &str, redirect_url: &str) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = FlowStateClaims {
            service: service.to_string(),
            redirect_url: redirect_url.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            token_use: TokenUse::FlowState,
            jti: Uuid::new_v4().to_string(),
        };
        Ok(self.jwt.encode(&claims)?)
    }

    /// Parses and verifies a state token.
    ///
    /// Any decode failure (bad signature, expiry, malformed payload, or
    /// a token of the wrong shape) is reported as
    /// [`AuthError::InvalidState`].
    pub fn parse_state(&self, state: &str) -> AuthResult<FlowState> {
        let claims: FlowStateClaims = self
            .jwt
            .decode(state)
            .map_err(|e| AuthError::invalid_state(e.to_string()))?;

        if claims.token_use != TokenUse::FlowState {
            return Err(AuthError::invalid_state("not a flow-state token"));
        }

        Ok(FlowState {
            service: claims.service,
            redirect_url: claims.redirect_url,
        })
    }
}
