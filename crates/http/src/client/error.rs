//! Client error types

use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// No usable session to authenticate the request with
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the server rejected the presented credential
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// HTTP status code behind this error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::AuthenticationFailed(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::ServerError { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::Serialization(_) | Self::Configuration(_) | Self::NotAuthenticated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_known_codes() {
        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, "expired".into());
        assert!(err.is_auth_failure());
        assert_eq!(err.status(), Some(401));

        let err = ClientError::from_status(StatusCode::FORBIDDEN, "nope".into());
        assert!(!err.is_auth_failure());
        assert_eq!(err.status(), Some(403));

        let err = ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream".into());
        assert!(matches!(err, ClientError::ServerError { status: 502, .. }));
    }
}
