//! Local account type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::jwt::SubjectClaims;

/// A local account.
///
/// Accounts come from either password registration or a completed
/// third-party authorization; OAuth-provisioned accounts carry no
/// password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier; its string form is the token `sub` claim.
    pub id: Uuid,

    /// Email address, unique across accounts.
    pub email: String,

    /// Username, unique across accounts.
    pub username: String,

    /// Given name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Family name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Granted scopes carried into issued access tokens.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Argon2 PHC digest; `None` for accounts provisioned through a
    /// third-party provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl User {
    /// Creates a new account with a fresh identifier and no optional fields.
    #[must_use]
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            username: username.into(),
            first_name: None,
            last_name: None,
            scopes: Vec::new(),
            password_hash: None,
        }
    }

    /// Projects this account into the identity claims that travel inside
    /// access tokens.
    #[must_use]
    pub fn subject_claims(&self) -> SubjectClaims {
        SubjectClaims {
            sub: self.id.to_string(),
            scopes: self.scopes.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_claims_projection() {
        let mut user = User::new("a@example.com", "alice");
        user.first_name = Some("Alice".to_string());
        user.scopes = vec!["profile".to_string()];

        let claims = user.subject_claims();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.first_name.as_deref(), Some("Alice"));
        assert!(claims.last_name.is_none());
        assert_eq!(claims.scopes, vec!["profile".to_string()]);
    }

    #[test]
    fn test_password_hash_not_serialized_when_absent() {
        let user = User::new("a@example.com", "alice");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
    }
}
