//! Transport abstraction the session gateway sends requests through

use super::ClientError;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// A replayable API request
///
/// Holds everything needed to send the same call twice, which the retry-once policy
/// relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Create a request without a body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Sends API requests and maps responses to JSON or a [`ClientError`]
///
/// An empty success body is returned as [`Value::Null`].
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>)
    -> Result<Value, ClientError>;
}
