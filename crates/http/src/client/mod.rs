//! Tokenward HTTP client

pub mod error;
pub mod issuer;
pub mod transport;

pub use error::ClientError;
pub use issuer::{HttpIssuer, Issuer};
pub use transport::{ApiRequest, Transport};

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header};
use serde_json::Value;
use std::time::Duration;

/// API client backed by reqwest
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder, optionally carrying a bearer token
    pub fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, url);

        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        request
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            // 204 and friends
            if body.trim().is_empty() {
                return Ok(serde_json::from_value(Value::Null)?);
            }
            Ok(serde_json::from_str(&body)?)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            debug!(status = status.as_u16(), "Request rejected by server");
            Err(ClientError::from_status(status, message))
        }
    }
}

#[async_trait(?Send)]
impl Transport for ApiClient {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<Value, ClientError> {
        let mut builder = self.request(request.method.clone(), &request.path, bearer);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        self.execute(builder).await
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout (ignored in the browser, where fetch has none)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        #[cfg(target_arch = "wasm32")]
        let _ = self.timeout; // Timeouts not supported on WASM

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder = client_builder.user_agent(concat!(
                "tokenward/",
                env!("CARGO_PKG_VERSION")
            ));
        }

        let client = client_builder.build()?;

        Ok(ApiClient { client, base_url })
    }
}
