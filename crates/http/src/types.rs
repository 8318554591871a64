//! Wire types for the issuer endpoints

use serde::{Deserialize, Serialize};

/// Body of a token refresh request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Body of a token refresh response
///
/// `refresh` is only present when the issuer rotates refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// Body of a profile response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub email: String,
    pub name: String,
}

impl From<ProfileResponse> for tokenward_core::Identity {
    fn from(profile: ProfileResponse) -> Self {
        Self {
            email: profile.email,
            name: profile.name,
        }
    }
}
