//! Tokenward core types and token decoding
//!
//! Shared by the HTTP seam and the session state machine: the token pair and identity
//! types, plus the claim decoder used to judge access-token expiry on the client.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{Claims, decode, is_expired, now_seconds, time_until_expiry};
pub use error::DecodeError;
pub use types::{Identity, LoginResponse, TokenPair};
