//! Shared protocol and credential types for the herald messaging service.
//!
//! The wire codec is deliberately stream-agnostic: every read/write helper
//! is generic over [`tokio::io::AsyncRead`] / [`tokio::io::AsyncWrite`], so
//! the same code runs over plain TCP in tests and over an encrypted
//! transport in deployment.

pub mod constants;
pub mod credential;
pub mod protocol;
