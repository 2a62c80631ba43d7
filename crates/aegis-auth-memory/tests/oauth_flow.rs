//! End-to-end authorization flow scenarios against the in-memory backend
//! and mocked provider endpoints.

use std::sync::Arc;
use std::time::Duration;

use aegis_auth::account::{AccountService, Argon2PasswordHasher, NewAccount};
use aegis_auth::cache::CacheBackend;
use aegis_auth::config::ProviderCredentials;
use aegis_auth::error::AuthError;
use aegis_auth::oauth::{
    AuthorizationCoordinator, IdentitySource, Provider, ProviderRegistry, StateCodec,
};
use aegis_auth::token::{
    JwtService, RevocationStore, SigningAlgorithm, SigningKeyPair, TokenService,
};
use aegis_auth_memory::{InMemoryTokenRecordStorage, InMemoryUserStorage};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCESS_TTL: Duration = Duration::from_secs(60);
const REFRESH_TTL: Duration = Duration::from_secs(3600);

struct Harness {
    coordinator: AuthorizationCoordinator,
    accounts: AccountService,
    tokens: Arc<TokenService>,
    state: StateCodec,
}

fn harness(providers: Vec<Provider>) -> Harness {
    let jwt = Arc::new(JwtService::new(
        SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap(),
    ));
    let records = Arc::new(InMemoryTokenRecordStorage::new());
    let users = Arc::new(InMemoryUserStorage::new());
    let revocation = Arc::new(RevocationStore::new(
        records.clone(),
        CacheBackend::new_local(),
        ACCESS_TTL,
    ));
    let tokens = Arc::new(TokenService::new(
        jwt.clone(),
        records.clone(),
        revocation,
        ACCESS_TTL,
        REFRESH_TTL,
    ));
    let registry = Arc::new(ProviderRegistry::new(
        "https://id.example.com/oauth/callback".to_string(),
        providers,
    ));
    let coordinator = AuthorizationCoordinator::new(
        registry,
        StateCodec::new(jwt.clone(), ACCESS_TTL),
        users.clone(),
        tokens.clone(),
    );
    let accounts = AccountService::new(
        users,
        records,
        tokens.clone(),
        Arc::new(Argon2PasswordHasher),
    );
    Harness {
        coordinator,
        accounts,
        tokens,
        state: StateCodec::new(jwt, ACCESS_TTL),
    }
}

fn creds() -> ProviderCredentials {
    ProviderCredentials {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        enabled: true,
    }
}

async fn mocked_github(server: &MockServer) -> Provider {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_abc",
            "scope": "read:user",
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": "octocat",
            "email": "octo@example.com",
            "name": "Octo Cat"
        })))
        .mount(server)
        .await;

    let mut provider =
        Provider::github(&creds()).with_token_endpoint(format!("{}/token", server.uri()));
    provider.identity = IdentitySource::UserInfo {
        endpoint: format!("{}/user", server.uri()),
        email_fallback: None,
    };
    provider
}

fn state_param(url: &Url) -> String {
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("authorize URL carries a state parameter")
}

#[tokio::test]
async fn full_authorization_flow_provisions_account_and_issues_pair() {
    let server = MockServer::start().await;
    let provider = mocked_github(&server).await;
    let h = harness(vec![provider]);

    let authorize_url = h
        .coordinator
        .start_authorization("github", "https://app/after-login")
        .unwrap();
    assert!(
        authorize_url
            .as_str()
            .starts_with("https://github.com/login/oauth/authorize?")
    );

    let state = state_param(&authorize_url);
    let outcome = h
        .coordinator
        .complete_authorization("the-code", &state)
        .await
        .unwrap();

    // The caller gets back the original redirect target plus a local pair.
    assert_eq!(outcome.redirect_url, "https://app/after-login");
    assert!(h.tokens.validate(&outcome.tokens.access_token).await);

    let claims = h
        .tokens
        .introspect(&outcome.tokens.access_token)
        .await
        .unwrap();
    assert_eq!(claims.email, "octo@example.com");
    assert_eq!(claims.username, "octocat");
    assert_eq!(claims.first_name.as_deref(), Some("Octo Cat"));

    // The refresh secret from the flow is redeemable like any other.
    let rotated = h.accounts.refresh(&outcome.tokens.refresh_token).await.unwrap();
    assert!(h.tokens.validate(&rotated.access_token).await);
}

#[tokio::test]
async fn state_round_trip_is_lossless() {
    let h = harness(vec![Provider::google(&creds())]);

    let state = h
        .state
        .build_state("google", "https://app/callback")
        .unwrap();
    let parsed = h.state.parse_state(&state).unwrap();

    assert_eq!(parsed.service, "google");
    assert_eq!(parsed.redirect_url, "https://app/callback");
}

#[tokio::test]
async fn github_state_fails_on_deployment_without_github() {
    let h = harness(vec![Provider::google(&creds())]);

    let state = h.state.build_state("github", "https://app/cb").unwrap();
    let result = h.coordinator.complete_authorization("code", &state).await;
    assert!(matches!(result, Err(AuthError::InvalidService { .. })));
}

#[tokio::test]
async fn provider_identity_clashing_with_local_account_is_rejected() {
    let server = MockServer::start().await;
    let provider = mocked_github(&server).await;
    let h = harness(vec![provider]);

    // A password account already owns the email the provider reports.
    h.accounts
        .register(NewAccount {
            email: "octo@example.com".to_string(),
            username: "incumbent".to_string(),
            password: "pw12345678".to_string(),
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap();

    let state = h.state.build_state("github", "https://app/cb").unwrap();
    let result = h
        .coordinator
        .complete_authorization("the-code", &state)
        .await;
    assert!(matches!(result, Err(AuthError::DuplicateIdentity)));
}

#[tokio::test]
async fn provider_rejection_surfaces_as_exchange_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client"
        })))
        .mount(&server)
        .await;

    let provider =
        Provider::github(&creds()).with_token_endpoint(format!("{}/token", server.uri()));
    let h = harness(vec![provider]);

    let state = h.state.build_state("github", "https://app/cb").unwrap();
    let result = h
        .coordinator
        .complete_authorization("stale-code", &state)
        .await;
    assert!(matches!(
        result,
        Err(AuthError::ProviderExchangeFailed { .. })
    ));
}
