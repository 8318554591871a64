//! Session error types

use std::time::Duration;
use thiserror::Error;
use tokenward_http::ClientError;

/// Why a token refresh did not produce a new pair
///
/// Cloneable because every caller waiting on the same refresh receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// There is no refresh token to use
    #[error("No active session to refresh")]
    NoSession,

    /// The refresh token's own expiry has passed
    #[error("Refresh token has expired")]
    RefreshTokenExpired,

    /// The issuer answered with an error status
    #[error("Issuer rejected refresh ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The issuer could not be reached
    #[error("Refresh request failed: {0}")]
    Network(String),

    /// The issuer did not answer in time
    #[error("Refresh timed out after {0:?}")]
    Timeout(Duration),

    /// The issuer answered with something other than a usable token
    #[error("Malformed refresh response: {0}")]
    MalformedResponse(String),

    /// The session was logged out or replaced while the refresh was in flight
    #[error("Session changed while refresh was in flight")]
    Superseded,
}

impl From<ClientError> for RefreshError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Request(e) => Self::Network(e.to_string()),
            ClientError::Serialization(e) => Self::MalformedResponse(e.to_string()),
            other => match other.status() {
                Some(status) => Self::Rejected {
                    status,
                    message: other.to_string(),
                },
                None => Self::Network(other.to_string()),
            },
        }
    }
}

/// Failure of the out-of-band profile lookup
#[derive(Debug, Error)]
pub enum ProfileFetchError {
    #[error("Profile request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Profile request timed out after {0:?}")]
    Timeout(Duration),
}
