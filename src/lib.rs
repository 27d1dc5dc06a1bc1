//! mintsync - an unofficial client for the Mint.com web service.
//!
//! Mint exposes no official API: every operation rides on the session
//! cookies and hidden page token a browser would use. This crate drives
//! that plumbing directly - credential login with optional two-factor
//! verification, token discovery in backend HTML, the asynchronous
//! "refresh accounts" polling protocol, and the authenticated read/write
//! calls that become simple once a session exists.
//!
//! ```no_run
//! use std::time::Duration;
//! use mintsync::{Credentials, EphemeralCodeListener, MintClient, RefreshOptions};
//!
//! # async fn run() -> Result<(), mintsync::ApiError> {
//! let client = MintClient::new()?;
//!
//! // A relay (e.g. an email-forwarding rule) delivers the one-time code
//! // to this short-lived local listener as GET /mintcode?123456.
//! let listener = EphemeralCodeListener::new(2222, "mintcode", Duration::from_secs(120));
//! let credentials = Credentials::new("user@example.com", "password");
//! client.login(&credentials, &listener).await?;
//!
//! let outcome = client.refresh_accounts(&RefreshOptions::default()).await?;
//! if outcome.completed() {
//!     for account in client.get_accounts().await? {
//!         println!("{}: {:?}", account.name, account.current_balance);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The backend's page structure is an external, unversioned dependency;
//! only the token-discovery contract is load-bearing here, and a changed
//! layout surfaces as a retryable [`ApiError::TokenNotFound`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiError, MintClient, RefreshJobStatus, RefreshOptions, RefreshOutcome, RefreshStatus};
pub use auth::{
    ChallengeState, CodeProvider, CookieStore, Credentials, EphemeralCodeListener, Session,
};
pub use config::ClientConfig;
pub use models::{
    Account, CashTransaction, Category, Tag, Transaction, TransactionEdit, TransactionQuery,
    TransactionSort,
};
