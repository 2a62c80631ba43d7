//! Engine configuration.
//!
//! All values are read-only after startup. Sections default individually
//! so a minimal configuration only names what it overrides.
//!
//! # Example (TOML)
//!
//! ```toml
//! redirect_uri = "https://id.example.com/oauth/callback"
//!
//! [token]
//! access_token_ttl = "1h"
//! refresh_token_ttl = "7d"
//! algorithm = "RS256"
//! private_key_path = "keys/private.pem"
//! public_key_path = "keys/public.pem"
//!
//! [providers.github]
//! client_id = "..."
//! client_secret = "..."
//! enabled = true
//!
//! [cache]
//! url = "redis://localhost:6379"
//! fail_closed = false
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Single callback URL registered with every provider.
    pub redirect_uri: String,

    /// Token lifetime and signing configuration.
    pub token: TokenConfig,

    /// Third-party provider credentials.
    pub providers: ProvidersConfig,

    /// Revocation cache configuration.
    pub cache: CacheConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            redirect_uri: String::new(),
            token: TokenConfig::default(),
            providers: ProvidersConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Token lifetime and signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Access token lifetime. Flow-state tokens reuse this value: a state
    /// must outlive the user's trip through the consent screen but not
    /// persist indefinitely.
    #[serde(with = "humantime_serde")]
    pub access_token_ttl: Duration,

    /// Refresh token lifetime. Rotation never extends a session past this
    /// horizon measured from the original login.
    #[serde(with = "humantime_serde")]
    pub refresh_token_ttl: Duration,

    /// Signing algorithm identifier. Supported: "RS256", "RS384".
    pub algorithm: String,

    /// Path to the PEM-encoded private signing key.
    pub private_key_path: PathBuf,

    /// Path to the PEM-encoded public verification key.
    pub public_key_path: PathBuf,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::from_secs(3600),          // 1 hour
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
            algorithm: "RS256".to_string(),
            private_key_path: PathBuf::new(),
            public_key_path: PathBuf::new(),
        }
    }
}

/// Credentials for one third-party provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderCredentials {
    /// OAuth client ID registered with the provider.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Whether this provider participates in authorization flows.
    pub enabled: bool,
}

/// Per-provider credential sections.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Google OAuth credentials.
    pub google: ProviderCredentials,

    /// GitHub OAuth credentials.
    pub github: ProviderCredentials,

    /// Discord OAuth credentials.
    pub discord: ProviderCredentials,
}

impl ProvidersConfig {
    /// Returns the enabled providers as an explicit `(name, credentials)`
    /// list, computed once at startup and handed to the registry.
    #[must_use]
    pub fn enabled(&self) -> Vec<(&'static str, &ProviderCredentials)> {
        let all = [
            ("google", &self.google),
            ("github", &self.github),
            ("discord", &self.discord),
        ];
        all.into_iter().filter(|(_, c)| c.enabled).collect()
    }
}

/// Revocation cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis connection URL. When absent, a process-local cache is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Treat an unreachable cache as "revoked" rather than "not revoked".
    /// Failing open favours availability; failing closed favours security.
    pub fail_closed: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            fail_closed: false,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - the redirect URI is missing or unparseable
    /// - the signing algorithm is not supported
    /// - a key path is missing
    /// - token lifetimes are zero or inverted
    /// - an enabled provider lacks credentials
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redirect_uri.is_empty() {
            return Err(ConfigError::Missing("redirect_uri".to_string()));
        }
        if Url::parse(&self.redirect_uri).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "redirect_uri is not a valid URL: {}",
                self.redirect_uri
            )));
        }

        match self.token.algorithm.as_str() {
            "RS256" | "RS384" => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid signing algorithm: '{other}'. Must be RS256 or RS384"
                )));
            }
        }

        if self.token.private_key_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("token.private_key_path".to_string()));
        }
        if self.token.public_key_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("token.public_key_path".to_string()));
        }

        if self.token.access_token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.access_token_ttl must be positive".to_string(),
            ));
        }
        if self.token.refresh_token_ttl <= self.token.access_token_ttl {
            return Err(ConfigError::InvalidValue(
                "token.refresh_token_ttl must exceed token.access_token_ttl".to_string(),
            ));
        }

        for (name, creds) in self.providers.enabled() {
            if creds.client_id.is_empty() || creds.client_secret.is_empty() {
                return Err(ConfigError::Missing(format!(
                    "providers.{name}.client_id/client_secret"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        let mut config = AuthConfig {
            redirect_uri: "https://id.example.com/oauth/callback".to_string(),
            ..AuthConfig::default()
        };
        config.token.private_key_path = PathBuf::from("keys/private.pem");
        config.token.public_key_path = PathBuf::from("keys/public.pem");
        config
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.token.access_token_ttl, Duration::from_secs(3600));
        assert_eq!(
            config.token.refresh_token_ttl,
            Duration::from_secs(7 * 24 * 3600)
        );
        assert_eq!(config.token.algorithm, "RS256");
        assert!(config.cache.url.is_none());
        assert!(!config.cache.fail_closed);
        assert!(config.providers.enabled().is_empty());
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_redirect_uri() {
        let mut config = valid_config();
        config.redirect_uri.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_validate_rejects_bad_algorithm() {
        let mut config = valid_config();
        config.token.algorithm = "HS256".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_ttls() {
        let mut config = valid_config();
        config.token.refresh_token_ttl = Duration::from_secs(60);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_rejects_enabled_provider_without_credentials() {
        let mut config = valid_config();
        config.providers.github.enabled = true;
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_enabled_provider_list_is_explicit() {
        let mut config = valid_config();
        config.providers.github.enabled = true;
        config.providers.github.client_id = "id".to_string();
        config.providers.github.client_secret = "secret".to_string();
        config.providers.discord.enabled = true;
        config.providers.discord.client_id = "id".to_string();
        config.providers.discord.client_secret = "secret".to_string();

        let names: Vec<&str> = config.providers.enabled().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["github", "discord"]);
    }

    #[test]
    fn test_durations_deserialize_from_humantime() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "redirect_uri": "https://id.example.com/cb",
            "token": {
                "access_token_ttl": "30m",
                "refresh_token_ttl": "14d"
            }
        }))
        .unwrap();

        assert_eq!(config.token.access_token_ttl, Duration::from_secs(1800));
        assert_eq!(
            config.token.refresh_token_ttl,
            Duration::from_secs(14 * 24 * 3600)
        );
    }
}
