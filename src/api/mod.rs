//! HTTP client module for the backend service.
//!
//! This module provides the `MintClient` for authenticating against the
//! backend and driving every call that needs a session: reference-data
//! reads, transaction listing and mutation, and the asynchronous
//! account-refresh protocol.
//!
//! The backend authenticates with session cookies plus a hidden page
//! token rather than any official API key.

pub mod client;
pub mod error;
pub mod refresh;

pub use client::MintClient;
pub use error::ApiError;
pub use refresh::{RefreshJobStatus, RefreshOptions, RefreshOutcome, RefreshStatus};
