//! Two-factor challenge resolution.
//!
//! The resolver asks the backend to deliver a one-time code out-of-band,
//! waits on a caller-supplied [`CodeProvider`] for the code, and submits
//! it. The provider is opaque: a local HTTP listener, a mailbox poller, or
//! an interactive prompt all look the same from here. A provider failure
//! propagates without anything being submitted; a backend rejection is
//! `MfaRejected` and is never retried automatically - the caller decides
//! whether to go again with a fresh code.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::auth::session::{establish, CookieStore, Session};
use crate::config::ClientConfig;

/// Path that triggers out-of-band delivery of a code.
pub(crate) const CHALLENGE_REQUEST_PATH: &str = "loginChallengeRequest.xevent";

/// Path the one-time code is submitted to.
pub(crate) const CHALLENGE_SUBMIT_PATH: &str = "loginChallengeSubmit.xevent";

/// Source of a one-time verification code.
///
/// One method, blocking the caller until a code is available or the
/// provider gives up with `CodeUnavailable` (or `ListenTimeout` for
/// listener-backed providers).
pub trait CodeProvider: Send + Sync {
    fn obtain(&self) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// Lifecycle of a challenge within one login attempt. The absence of a
/// challenge is represented by the login outcome itself, not a state here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Required,
    CodeSubmitted,
    Verified,
    Failed,
}

/// Context for a pending multi-factor challenge: the delivery channel the
/// backend announced and the timeout policy for waiting on the code.
/// Exists only for the duration of one login attempt.
#[derive(Debug)]
pub struct MfaChallenge {
    channel: String,
    timeout: Duration,
    state: ChallengeState,
}

impl MfaChallenge {
    pub(crate) fn new(channel: String, timeout: Duration) -> Self {
        Self {
            channel,
            timeout,
            state: ChallengeState::Required,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }
}

/// Resolve a pending challenge and return the established session.
pub(crate) async fn resolve<P: CodeProvider>(
    http: &reqwest::Client,
    config: &ClientConfig,
    mut cookies: CookieStore,
    challenge: &mut MfaChallenge,
    provider: &P,
) -> Result<Session, ApiError> {
    request_code_delivery(http, config, &mut cookies, challenge).await?;

    info!(channel = %challenge.channel, "Waiting for verification code");
    let code = match tokio::time::timeout(challenge.timeout, provider.obtain()).await {
        Ok(Ok(code)) => code,
        Ok(Err(err)) => {
            challenge.state = ChallengeState::Failed;
            warn!(error = %err, "Code provider failed; nothing submitted");
            return Err(err);
        }
        Err(_) => {
            challenge.state = ChallengeState::Failed;
            return Err(ApiError::CodeUnavailable(format!(
                "no code within {:?}",
                challenge.timeout
            )));
        }
    };

    submit_code(http, config, &mut cookies, challenge, &code).await?;
    establish(http, config, cookies).await
}

/// Tell the backend to send the code over the challenge's channel.
async fn request_code_delivery(
    http: &reqwest::Client,
    config: &ClientConfig,
    cookies: &mut CookieStore,
    challenge: &MfaChallenge,
) -> Result<(), ApiError> {
    let response = http
        .post(config.url(CHALLENGE_REQUEST_PATH))
        .header(reqwest::header::COOKIE, cookies.header_value())
        .form(&[("channel", challenge.channel.as_str())])
        .send()
        .await?;

    cookies.absorb(response.headers());
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status, &body));
    }
    debug!(channel = %challenge.channel, "Code delivery requested");
    Ok(())
}

async fn submit_code(
    http: &reqwest::Client,
    config: &ClientConfig,
    cookies: &mut CookieStore,
    challenge: &mut MfaChallenge,
    code: &str,
) -> Result<(), ApiError> {
    challenge.state = ChallengeState::CodeSubmitted;
    info!("Submitting verification code");

    let response = http
        .post(config.url(CHALLENGE_SUBMIT_PATH))
        .header(reqwest::header::COOKIE, cookies.header_value())
        .form(&[("code", code), ("channel", challenge.channel.as_str())])
        .send()
        .await?;

    cookies.absorb(response.headers());

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if code_rejected(status, &body) {
        challenge.state = ChallengeState::Failed;
        return Err(ApiError::MfaRejected);
    }
    if !status.is_success() {
        challenge.state = ChallengeState::Failed;
        return Err(ApiError::from_status(status, &body));
    }

    challenge.state = ChallengeState::Verified;
    Ok(())
}

/// A wrong or expired code comes back as 401/403 or as a 2xx carrying the
/// backend's error envelope.
fn code_rejected(status: reqwest::StatusCode, body: &str) -> bool {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return true;
    }
    status.is_success()
        && serde_json::from_str::<serde_json::Value>(body)
            .map(|v| v.get("error").is_some())
            .unwrap_or(false)
}
