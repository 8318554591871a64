//! Issuer endpoints: token refresh and profile lookup

use super::{ApiClient, ApiRequest, ClientError, Transport};
use crate::types::{ProfileResponse, RefreshRequest, RefreshResponse};
use async_trait::async_trait;
use tokenward_core::Identity;

/// Default path of the refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/api/token/refresh/";

/// Default path of the profile endpoint
pub const DEFAULT_PROFILE_PATH: &str = "/api/user/";

/// The token-issuing backend as seen by the session core
#[async_trait(?Send)]
pub trait Issuer {
    /// Exchange a refresh token for a new access token
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError>;

    /// Look up the identity behind an access token
    async fn fetch_profile(&self, access_token: &str) -> Result<Identity, ClientError>;
}

/// Issuer reached over HTTP through a [`Transport`]
#[derive(Clone)]
pub struct HttpIssuer<T = ApiClient> {
    transport: T,
    refresh_path: String,
    profile_path: String,
}

impl<T: Transport> HttpIssuer<T> {
    /// Create an issuer using the default endpoint paths
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
        }
    }

    /// Override the refresh endpoint path
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Override the profile endpoint path
    #[must_use]
    pub fn with_profile_path(mut self, path: impl Into<String>) -> Self {
        self.profile_path = path.into();
        self
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait(?Send)]
impl<T: Transport> Issuer for HttpIssuer<T> {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError> {
        let request = ApiRequest::post(&self.refresh_path).json(&RefreshRequest {
            refresh: refresh_token.to_string(),
        })?;
        let body = self.transport.send(&request, None).await?;
        let response: RefreshResponse = serde_json::from_value(body)?;
        debug!(rotated = response.refresh.is_some(), "Issuer returned refreshed access token");
        Ok(response)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Identity, ClientError> {
        let request = ApiRequest::get(&self.profile_path);
        let body = self.transport.send(&request, Some(access_token)).await?;
        let profile: ProfileResponse = serde_json::from_value(body)?;
        Ok(profile.into())
    }
}
