//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when a refresh response carries no new refresh token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshRotation {
    /// The issuer does not rotate; keep using the current refresh token
    #[default]
    Optional,
    /// The issuer always rotates; a response without a refresh token is a failure
    Required,
}

/// Session configuration
///
/// Every field has a default, so a host page can pass a partial JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Storage key for the access token
    pub access_token_key: String,
    /// Storage key for the refresh token
    pub refresh_token_key: String,
    /// Renew access tokens with this many seconds or less left
    pub refresh_threshold_secs: i64,
    /// Timeout for issuer calls (refresh and profile) in milliseconds
    pub issuer_timeout_ms: u64,
    /// Refresh token rotation contract of the issuer
    pub rotation: RefreshRotation,
}

impl SessionConfig {
    /// Default storage key for the access token
    pub const ACCESS_TOKEN_KEY: &'static str = "access_token";

    /// Default storage key for the refresh token
    pub const REFRESH_TOKEN_KEY: &'static str = "refresh_token";

    /// Default renewal threshold in seconds
    pub const REFRESH_THRESHOLD_SECS: i64 = 300; // 5 minutes

    /// Default issuer timeout in milliseconds
    pub const ISSUER_TIMEOUT_MS: u64 = 10_000;

    /// Parse a configuration from JSON, filling in defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Issuer call timeout
    pub const fn issuer_timeout(&self) -> Duration {
        Duration::from_millis(self.issuer_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_key: Self::ACCESS_TOKEN_KEY.to_string(),
            refresh_token_key: Self::REFRESH_TOKEN_KEY.to_string(),
            refresh_threshold_secs: Self::REFRESH_THRESHOLD_SECS,
            issuer_timeout_ms: Self::ISSUER_TIMEOUT_MS,
            rotation: RefreshRotation::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            SessionConfig::from_json(r#"{ "refresh_threshold_secs": 60, "rotation": "required" }"#)
                .unwrap();

        assert_eq!(config.refresh_threshold_secs, 60);
        assert_eq!(config.rotation, RefreshRotation::Required);
        assert_eq!(config.access_token_key, "access_token");
        assert_eq!(config.issuer_timeout(), Duration::from_secs(10));
    }
}
