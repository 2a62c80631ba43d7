//! Third-party authorization flow orchestration.
//!
//! The coordinator ties the pieces together: build the authorize URL,
//! and on callback validate the flow state, exchange the code, normalize
//! the identity, provision a local account, and issue a token pair. Both
//! halves of the flow terminate at the token service, same as a password
//! login.

use std::sync::Arc;

use url::Url;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::provider::ProviderRegistry;
use crate::oauth::state::StateCodec;
use crate::storage::UserStorage;
use crate::token::service::{TokenPair, TokenService};
use crate::types::User;

/// Result of a completed authorization: where to send the user, and the
/// pair to deliver there (e.g., via URL fragment).
#[derive(Debug)]
pub struct AuthorizationOutcome {
    /// Redirect target recovered from the flow state.
    pub redirect_url: String,

    /// Freshly issued local token pair.
    pub tokens: TokenPair,
}

/// Orchestrates the authorization-code flow across providers.
pub struct AuthorizationCoordinator {
    registry: Arc<ProviderRegistry>,
    state: StateCodec,
    users: Arc<dyn UserStorage>,
    tokens: Arc<TokenService>,
}

impl AuthorizationCoordinator {
    /// Creates a new coordinator.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        state: StateCodec,
        users: Arc<dyn UserStorage>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            registry,
            state,
            users,
            tokens,
        }
    }

    /// Builds the provider's authorize URL for the user to be redirected
    /// to, with a signed flow state carrying the provider name and the
    /// post-login redirect target.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidService`] for unknown or disabled providers
    /// - an encoding error if state signing fails
    pub fn start_authorization(&self, service: &str, redirect_url: &str) -> AuthResult<Url> {
        let provider = self.registry.get(service)?;
        let state = self.state.build_state(service, redirect_url)?;
        let url = provider.authorize_url(self.registry.redirect_uri(), &state)?;

        tracing::debug!(provider = %service, "authorization started");
        Ok(url)
    }

    /// Completes the flow after the provider redirected back with a code.
    ///
    /// Validates the state, exchanges the code, fetches and normalizes
    /// the identity, provisions a local account, and issues a token pair.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidState`] if the state fails verification
    /// - [`AuthError::InvalidService`] if the state names an unregistered
    ///   provider
    /// - [`AuthError::ProviderExchangeFailed`] / [`AuthError::MissingEmail`]
    ///   from the provider steps
    /// - [`AuthError::DuplicateIdentity`] if the email or username is
    ///   already taken by an existing account
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
    ) -> AuthResult<AuthorizationOutcome> {
        let flow = self.state.parse_state(state)?;
        let provider = self.registry.get(&flow.service)?;

        let provider_token = self.registry.exchange_code(provider, code).await?;
        let identity = self.registry.fetch_identity(provider, &provider_token).await?;

        if self.users.get_by_email(&identity.email).await?.is_some()
            || self
                .users
                .get_by_username(&identity.username)
                .await?
                .is_some()
        {
            return Err(AuthError::DuplicateIdentity);
        }

        let mut user = User::new(identity.email, identity.username);
        user.first_name = identity.first_name;
        user.last_name = identity.last_name;
        self.users.create(&user).await?;

        tracing::info!(
            provider = %flow.service,
            subject = %user.id,
            "provisioned account from provider identity"
        );

        let tokens = self.tokens.issue(&user.subject_claims()).await?;
        Ok(AuthorizationOutcome {
            redirect_url: flow.redirect_url,
            tokens,
        })
    }
}
