//! Tokenward session management
//!
//! Holds the client's access/refresh token pair, renews it before it expires, and
//! retries API calls once after the server rejects a stale token. Everything here is
//! single-threaded: handles are `Rc`-based and futures are `!Send`.

#[macro_use]
extern crate tracing;

pub mod auth;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod storage;

mod runtime;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod test_support;

pub use auth::{
    ProfileFetchError, RefreshError, SessionContext, SessionState, SessionStatus, Subscription,
};
pub use config::{RefreshRotation, SessionConfig};
pub use gateway::RequestGateway;
pub use storage::{MemoryTokenStore, StorageError, TokenStore};

#[cfg(target_arch = "wasm32")]
pub use storage::BrowserTokenStore;

pub use tokenward_core::{Identity, LoginResponse, TokenPair};
pub use tokenward_http::{ApiClient, ApiRequest, ClientError, HttpIssuer, Issuer, Transport};
