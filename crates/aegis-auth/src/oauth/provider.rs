//! Third-party provider registry.
//!
//! Each supported provider is described by a [`Provider`] entry: its
//! endpoints, scope string, parameter shaping for the authorize and token
//! requests, and how to obtain an identity from its token response. The
//! registry is built once at startup from the enabled-provider list in
//! configuration and resolved by table lookup; adding a provider means
//! adding a descriptor, not a subclass.
//!
//! Protocol variance handled here:
//!
//! - token requests are query-string shaped (google, github) or
//!   form-encoded with basic auth (discord)
//! - identity comes from a user-info endpoint (github, discord) or from
//!   an ID token embedded in the token response (google), decoded without
//!   signature verification; trust is delegated to the provider's own
//!   issuance guarantee
//! - github may omit the email from the primary response; a verified-email
//!   list is fetched as a fallback before giving up

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use crate::AuthResult;
use crate::config::{AuthConfig, ProviderCredentials};
use crate::error::AuthError;

/// The minimal identity projection every provider response is mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    /// Email address; always present (flows without one fail earlier).
    pub email: String,

    /// Username to provision the local account with.
    pub username: String,

    /// Given name, when the provider exposes one.
    pub first_name: Option<String>,

    /// Family name, when the provider exposes one.
    pub last_name: Option<String>,
}

/// A provider's token-endpoint response.
///
/// One shape with optional fields covers all providers: google returns an
/// `id_token` and `refresh_token`, github only `access_token` and `scope`,
/// discord everything but `id_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderToken {
    /// The provider-side access token.
    pub access_token: String,

    /// Token type as reported by the provider.
    #[serde(default)]
    pub token_type: Option<String>,

    /// Granted scope string.
    #[serde(default)]
    pub scope: Option<String>,

    /// Provider-side access token lifetime, seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Provider-side refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// OIDC ID token with embedded identity claims.
    #[serde(default)]
    pub id_token: Option<String>,
}

/// How the token-endpoint request body is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRequestStyle {
    /// Parameters in the query string, credentials included as parameters.
    Query,
    /// Form-encoded body with HTTP basic-auth credentials.
    FormWithBasicAuth,
}

/// Where a provider's identity claims come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// GET a user-info endpoint with the provider access token.
    UserInfo {
        /// The user-info endpoint.
        endpoint: String,
        /// Endpoint listing the account's emails, queried when the
        /// primary response lacks a usable email.
        email_fallback: Option<String>,
    },
    /// Decode the identity claims embedded in the token response's
    /// `id_token`, without signature verification.
    EmbeddedIdToken,
}

/// Field names for mapping a provider's identity document into
/// [`NormalizedIdentity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMapping {
    /// Field holding the username.
    pub username_field: &'static str,

    /// Field holding the given name, if the provider has one.
    pub first_name_field: Option<&'static str>,

    /// Field holding the family name, if the provider has one.
    pub last_name_field: Option<&'static str>,
}

/// Static description of one provider: endpoints, scope, parameter
/// shaping, and identity mapping.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Registry key; also the `service` claim of flow-state tokens.
    pub name: String,

    /// Authorization (consent screen) endpoint.
    pub authorize_endpoint: String,

    /// Code-exchange endpoint.
    pub token_endpoint: String,

    /// Scope string advertised in the authorize URL.
    pub scope: String,

    /// Provider-specific authorize-URL parameters.
    pub extra_auth_params: Vec<(String, String)>,

    /// Provider-specific token-request parameters.
    pub extra_token_params: Vec<(String, String)>,

    /// Token-request body shaping.
    pub token_request: TokenRequestStyle,

    /// Identity claim source.
    pub identity: IdentitySource,

    /// Identity field mapping.
    pub mapping: IdentityMapping,

    /// OAuth client ID.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,
}

impl Provider {
    /// Builds the google descriptor.
    #[must_use]
    pub fn google(creds: &ProviderCredentials) -> Self {
        let scope = "https://www.googleapis.com/auth/userinfo.email \
                     https://www.googleapis.com/auth/userinfo.profile openid";
        Self {
            name: "google".to_string(),
            authorize_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            scope: scope.to_string(),
            extra_auth_params: vec![
                ("response_type".to_string(), "code".to_string()),
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
            extra_token_params: vec![
                ("grant_type".to_string(), "authorization_code".to_string()),
                ("granted_scopes".to_string(), scope.to_string()),
            ],
            token_request: TokenRequestStyle::Query,
            identity: IdentitySource::EmbeddedIdToken,
            mapping: IdentityMapping {
                username_field: "given_name",
                first_name_field: Some("given_name"),
                last_name_field: Some("family_name"),
            },
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
        }
    }

    /// Builds the github descriptor.
    #[must_use]
    pub fn github(creds: &ProviderCredentials) -> Self {
        Self {
            name: "github".to_string(),
            authorize_endpoint: "https://github.com/login/oauth/authorize".to_string(),
            token_endpoint: "https://github.com/login/oauth/access_token".to_string(),
            scope: "read:user user:email user:follow".to_string(),
            extra_auth_params: Vec::new(),
            extra_token_params: Vec::new(),
            token_request: TokenRequestStyle::Query,
            identity: IdentitySource::UserInfo {
                endpoint: "https://api.github.com/user".to_string(),
                email_fallback: Some("https://api.github.com/user/emails".to_string()),
            },
            mapping: IdentityMapping {
                username_field: "login",
                first_name_field: Some("name"),
                last_name_field: None,
            },
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
        }
    }

    /// Builds the discord descriptor.
    #[must_use]
    pub fn discord(creds: &ProviderCredentials) -> Self {
        Self {
            name: "discord".to_string(),
            authorize_endpoint: "https://discord.com/oauth2/authorize".to_string(),
            token_endpoint: "https://discord.com/api/oauth2/token".to_string(),
            scope: "identify email".to_string(),
            extra_auth_params: vec![("response_type".to_string(), "code".to_string())],
            extra_token_params: vec![(
                "grant_type".to_string(),
                "authorization_code".to_string(),
            )],
            token_request: TokenRequestStyle::FormWithBasicAuth,
            identity: IdentitySource::UserInfo {
                endpoint: "https://discord.com/api/v10/users/@me".to_string(),
                email_fallback: None,
            },
            mapping: IdentityMapping {
                username_field: "username",
                first_name_field: None,
                last_name_field: None,
            },
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
        }
    }

    /// Overrides the authorize endpoint.
    #[must_use]
    pub fn with_authorize_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authorize_endpoint = endpoint.into();
        self
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Builds the authorize redirect URL for this provider.
    ///
    /// # Errors
    /// Returns an error if the configured authorize endpoint is not a
    /// valid URL.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> AuthResult<Url> {
        let mut url = Url::parse(&self.authorize_endpoint).map_err(|e| {
            AuthError::configuration(format!(
                "Invalid authorize endpoint for {}: {e}",
                self.name
            ))
        })?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", redirect_uri);
            params.append_pair("state", state);
            params.append_pair("scope", &self.scope);
            for (key, value) in &self.extra_auth_params {
                params.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

/// Registry of enabled providers plus the HTTP client used to reach them.
pub struct ProviderRegistry {
    providers: HashMap<String, Provider>,
    redirect_uri: String,
    http: reqwest::Client,
}

impl ProviderRegistry {
    /// Builds the registry from configuration: one descriptor per enabled
    /// provider, computed once at startup.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut providers = Vec::new();
        if config.providers.google.enabled {
            providers.push(Provider::google(&config.providers.google));
        }
        if config.providers.github.enabled {
            providers.push(Provider::github(&config.providers.github));
        }
        if config.providers.discord.enabled {
            providers.push(Provider::discord(&config.providers.discord));
        }
        Self::new(config.redirect_uri.clone(), providers)
    }

    /// Creates a registry from explicit descriptors.
    #[must_use]
    pub fn new(redirect_uri: String, providers: Vec<Provider>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("aegis-auth/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let providers: HashMap<String, Provider> = providers
            .into_iter()
            .inspect(|p| tracing::info!(provider = %p.name, "registered provider"))
            .map(|p| (p.name.clone(), p))
            .collect();

        Self {
            providers,
            redirect_uri,
            http,
        }
    }

    /// Looks up a provider by name.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidService`] for unknown names.
    pub fn get(&self, service: &str) -> AuthResult<&Provider> {
        self.providers
            .get(service)
            .ok_or_else(|| AuthError::invalid_service(service))
    }

    /// The callback URL shared by all providers.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Names of the registered providers.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Exchanges an authorization code at the provider's token endpoint.
    ///
    /// # Errors
    /// Returns [`AuthError::ProviderExchangeFailed`] on any non-success
    /// response, network failure, or unparseable body.
    pub async fn exchange_code(
        &self,
        provider: &Provider,
        code: &str,
    ) -> AuthResult<ProviderToken> {
        let mut params: Vec<(String, String)> = vec![
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), self.redirect_uri.clone()),
        ];
        params.extend(provider.extra_token_params.iter().cloned());

        let request = match provider.token_request {
            TokenRequestStyle::Query => {
                params.push(("client_id".to_string(), provider.client_id.clone()));
                params.push(("client_secret".to_string(), provider.client_secret.clone()));
                self.http.post(&provider.token_endpoint).query(&params)
            }
            TokenRequestStyle::FormWithBasicAuth => self
                .http
                .post(&provider.token_endpoint)
                .form(&params)
                .basic_auth(&provider.client_id, Some(&provider.client_secret)),
        };

        tracing::debug!(provider = %provider.name, "exchanging authorization code");

        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::provider_exchange_failed(&provider.name, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::provider_exchange_failed(
                &provider.name,
                format!("HTTP {status} - {body}"),
            ));
        }

        response.json::<ProviderToken>().await.map_err(|e| {
            AuthError::provider_exchange_failed(
                &provider.name,
                format!("Failed to parse token response: {e}"),
            )
        })
    }

    /// Obtains the normalized identity behind a provider token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ProviderExchangeFailed`] if the user-info call fails
    ///   or the identity document is unusable
    /// - [`AuthError::MissingEmail`] if no usable email can be found, even
    ///   through the fallback
    pub async fn fetch_identity(
        &self,
        provider: &Provider,
        token: &ProviderToken,
    ) -> AuthResult<NormalizedIdentity> {
        let document = match &provider.identity {
            IdentitySource::EmbeddedIdToken => {
                let id_token = token.id_token.as_deref().ok_or_else(|| {
                    AuthError::provider_exchange_failed(
                        &provider.name,
                        "token response missing id_token",
                    )
                })?;
                decode_id_token_payload(id_token).map_err(|e| {
                    AuthError::provider_exchange_failed(
                        &provider.name,
                        format!("malformed id_token: {e}"),
                    )
                })?
            }
            IdentitySource::UserInfo { endpoint, .. } => {
                self.get_json(provider, endpoint, &token.access_token).await?
            }
        };

        let email = match string_field(&document, "email") {
            Some(email) => email,
            None => self.fallback_email(provider, token).await?,
        };

        let mapping = &provider.mapping;
        let username = string_field(&document, mapping.username_field).ok_or_else(|| {
            AuthError::provider_exchange_failed(
                &provider.name,
                format!("identity document missing '{}'", mapping.username_field),
            )
        })?;
        let first_name = mapping
            .first_name_field
            .and_then(|field| string_field(&document, field));
        let last_name = mapping
            .last_name_field
            .and_then(|field| string_field(&document, field));

        Ok(NormalizedIdentity {
            email,
            username,
            first_name,
            last_name,
        })
    }

    /// Fetches the account's email list and picks the primary entry.
    async fn fallback_email(
        &self,
        provider: &Provider,
        token: &ProviderToken,
    ) -> AuthResult<String> {
        let IdentitySource::UserInfo {
            email_fallback: Some(endpoint),
            ..
        } = &provider.identity
        else {
            return Err(AuthError::missing_email(&provider.name));
        };

        tracing::debug!(provider = %provider.name, "primary identity lacked email, trying fallback");

        let document = self
            .get_json(provider, endpoint, &token.access_token)
            .await?;
        let entries: Vec<EmailEntry> =
            serde_json::from_value(document).map_err(|e| {
                AuthError::provider_exchange_failed(
                    &provider.name,
                    format!("Failed to parse email list: {e}"),
                )
            })?;

        entries
            .into_iter()
            .find(|entry| entry.primary)
            .map(|entry| entry.email)
            .ok_or_else(|| AuthError::missing_email(&provider.name))
    }

    async fn get_json(
        &self,
        provider: &Provider,
        endpoint: &str,
        access_token: &str,
    ) -> AuthResult<serde_json::Value> {
        let response = self
            .http
            .get(endpoint)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::provider_exchange_failed(&provider.name, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AuthError::provider_exchange_failed(
                &provider.name,
                format!("HTTP {status} from {endpoint}"),
            ));
        }

        response.json().await.map_err(|e| {
            AuthError::provider_exchange_failed(
                &provider.name,
                format!("Failed to parse identity response: {e}"),
            )
        })
    }
}

/// One entry of an email-list fallback response.
#[derive(Debug, Deserialize)]
struct EmailEntry {
    email: String,
    #[serde(default)]
    primary: bool,
}

/// Decodes the payload segment of a JWT without verifying its signature.
fn decode_id_token_payload(id_token: &str) -> Result<serde_json::Value, String> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| "missing payload segment".to_string())?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

/// Reads a non-empty string field from a JSON document.
fn string_field(document: &serde_json::Value, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
