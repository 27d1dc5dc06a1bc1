//! Authentication and session lifecycle.
//!
//! This module provides:
//! - `Credentials` and credential submission against the login endpoint
//! - `MfaChallenge` resolution with a pluggable `CodeProvider`
//! - `EphemeralCodeListener`: a one-shot local HTTP code receiver
//! - `Session`/`CookieStore`: the cookie jar and hidden token that
//!   authenticate every later request
//! - token extraction from backend HTML/JSON documents
//!
//! Sessions live in memory only and are replaced wholesale on re-login.

pub mod listener;
pub mod login;
pub mod mfa;
pub mod session;
pub mod token;

pub use listener::EphemeralCodeListener;
pub use login::{Credentials, LoginOutcome};
pub use mfa::{ChallengeState, CodeProvider, MfaChallenge};
pub use session::{Cookie, CookieStore, Session};
pub use token::extract_token;
