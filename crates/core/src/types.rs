//! Token and identity types shared across crates

use serde::{Deserialize, Serialize};

/// Access and refresh bearer tokens issued together
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    /// Create a new token pair
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Tokens are credentials; keep them out of logs.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// The signed-in user as shown to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
}

/// Successful response of the issuer's login exchange
///
/// Extra user fields sent by the issuer are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub tokens: TokenPair,
    pub user: Identity,
}

impl LoginResponse {
    /// Split into the arguments of a session login
    pub fn into_parts(self) -> (TokenPair, Identity) {
        (self.tokens, self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_ignores_extra_user_fields() {
        let body = serde_json::json!({
            "tokens": { "access": "a.b.c", "refresh": "r" },
            "user": { "email": "ada@example.com", "name": "Ada", "id": 7, "is_staff": false }
        });

        let response: LoginResponse = serde_json::from_value(body).unwrap();
        let (pair, user) = response.into_parts();
        assert_eq!(pair, TokenPair::new("a.b.c", "r"));
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let printed = format!("{pair:?}");
        assert!(!printed.contains("secret"));
    }
}
