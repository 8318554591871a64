//! Helpers shared by unit tests

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;
use tokenward_core::{Identity, codec};
use tokenward_http::ClientError;
use tokenward_http::Issuer;
use tokenward_http::types::RefreshResponse;

pub(crate) fn identity() -> Identity {
    identity_of("Ada")
}

pub(crate) fn identity_of(name: &str) -> Identity {
    Identity {
        email: format!("{}@example.com", name.to_lowercase()),
        name: name.to_string(),
    }
}

fn sign(claims: &serde_json::Value) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

/// Access token for `identity()` expiring `expires_in` seconds from now
pub(crate) fn token(expires_in: i64) -> String {
    let user = identity();
    sign(&json!({
        "exp": codec::now_seconds() + expires_in,
        "email": user.email,
        "name": user.name,
    }))
}

/// Access token without identity claims
pub(crate) fn token_without_identity(expires_in: i64) -> String {
    sign(&json!({ "exp": codec::now_seconds() + expires_in, "sub": "1" }))
}

/// Issuer answering from fixed values
pub(crate) struct StaticIssuer {
    pub calls: Rc<Cell<usize>>,
    pub access: Option<String>,
    pub profile: Option<Identity>,
}

impl StaticIssuer {
    pub(crate) fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl Default for StaticIssuer {
    fn default() -> Self {
        Self {
            calls: Rc::default(),
            access: None,
            profile: Some(identity()),
        }
    }
}

#[async_trait(?Send)]
impl Issuer for StaticIssuer {
    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshResponse, ClientError> {
        self.calls.set(self.calls.get() + 1);
        self.access
            .clone()
            .map(|access| RefreshResponse {
                access,
                refresh: None,
            })
            .ok_or_else(|| ClientError::AuthenticationFailed("Token is invalid or expired".into()))
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<Identity, ClientError> {
        // Answer on the second poll, like a real lookup would
        tokio::task::yield_now().await;
        self.profile
            .clone()
            .ok_or_else(|| ClientError::NotFound("no profile".into()))
    }
}
