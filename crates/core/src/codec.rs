//! Claim decoding for access tokens
//!
//! The client only needs the expiry and identity claims of a token it was handed by the
//! issuer. Signatures are the issuer's business and are not checked here.

use crate::error::DecodeError;
use crate::types::Identity;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Claims read from a token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,
    /// User's email address
    #[serde(default)]
    pub email: Option<String>,
    /// User's display name
    #[serde(default)]
    pub name: Option<String>,
    /// Issued at (as UTC timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    /// Identity carried by the token, if it has both email and name
    pub fn identity(&self) -> Option<Identity> {
        match (&self.email, &self.name) {
            (Some(email), Some(name)) => Some(Identity {
                email: email.clone(),
                name: name.clone(),
            }),
            _ => None,
        }
    }
}

/// Current wall-clock time in seconds since the Unix epoch
pub fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Decode the payload segment of a token without verifying its signature
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Segments(segments.len()));
    }

    let payload = segments[1].trim_end_matches('=');
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Whether the token is expired at `now`, allowing `skew` seconds of early expiry
///
/// A token that cannot be decoded counts as expired.
pub fn is_expired(token: &str, now: i64, skew: i64) -> bool {
    decode(token).map_or(true, |claims| now.saturating_add(skew) >= claims.exp)
}

/// Seconds left before the token expires; negative once it has
pub fn time_until_expiry(token: &str, now: i64) -> Result<i64, DecodeError> {
    decode(token).map(|claims| claims.exp.saturating_sub(now))
}
