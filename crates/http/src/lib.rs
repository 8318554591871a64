//! Tokenward HTTP module providing the API transport and issuer client
//!
//! The session core talks to the network only through the [`client::Transport`] and
//! [`client::Issuer`] traits defined here, so it can be driven by in-memory fakes in tests.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod types;

pub use client::{ApiClient, ApiRequest, ClientError, HttpIssuer, Issuer, Transport};
