//! Credential submission.
//!
//! One POST carries the credentials; everything else is interpretation of
//! a browser-oriented response. The backend answers 2xx for all three
//! outcomes (accepted, challenge pending, rejected) and distinguishes them
//! with body markers, so the interpretation lives in a pure function that
//! the unit tests can hit without a server.

use reqwest::StatusCode;
use tracing::{debug, info};

use crate::api::ApiError;
use crate::auth::mfa::MfaChallenge;
use crate::auth::session::CookieStore;
use crate::config::ClientConfig;

/// Path the credential form is posted to.
pub(crate) const LOGIN_PATH: &str = "loginUserSubmit.xevent";

/// Login credentials. Input-only: consumed by the login call and never
/// stored anywhere by this crate.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs and error chains.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the backend decided about the submitted credentials.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials accepted outright; token extraction comes next.
    Accepted,
    /// Credentials accepted, but a one-time code must be verified first.
    MfaRequired(MfaChallenge),
    /// Invalid credentials. Not retryable without human intervention.
    Rejected(String),
}

/// Submit the credentials. Exactly one network call; connection-level
/// failures surface as `ApiError::Network` for the caller to retry at its
/// own discretion.
pub(crate) async fn submit_credentials(
    http: &reqwest::Client,
    config: &ClientConfig,
    cookies: &mut CookieStore,
    credentials: &Credentials,
) -> Result<LoginOutcome, ApiError> {
    info!(email = %credentials.email, "Submitting credentials");

    let response = http
        .post(config.url(LOGIN_PATH))
        .form(&[
            ("username", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
            ("task", "L"),
        ])
        .send()
        .await?;

    cookies.absorb(response.headers());

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success()
        && status != StatusCode::UNAUTHORIZED
        && status != StatusCode::FORBIDDEN
    {
        return Err(ApiError::from_status(status, &body));
    }
    let outcome = interpret_login_response(status, &body, config);
    debug!(%status, outcome = outcome_name(&outcome), "Login response interpreted");
    Ok(outcome)
}

fn outcome_name(outcome: &LoginOutcome) -> &'static str {
    match outcome {
        LoginOutcome::Accepted => "accepted",
        LoginOutcome::MfaRequired(_) => "mfa_required",
        LoginOutcome::Rejected(_) => "rejected",
    }
}

/// Decide the outcome from status and body markers.
fn interpret_login_response(
    status: StatusCode,
    body: &str,
    config: &ClientConfig,
) -> LoginOutcome {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return LoginOutcome::Rejected(rejection_reason(body));
    }

    let parsed: serde_json::Value = serde_json::from_str(body).unwrap_or_default();

    if let Some(challenge) = parsed.get("challenge") {
        let channel = challenge
            .get("channel")
            .and_then(|c| c.as_str())
            .unwrap_or("email")
            .to_string();
        return LoginOutcome::MfaRequired(MfaChallenge::new(channel, config.mfa_code_timeout));
    }

    if parsed.get("error").is_some() {
        return LoginOutcome::Rejected(rejection_reason(body));
    }

    LoginOutcome::Accepted
}

/// Pull the human-readable rejection text out of the error envelope
/// (`error.vError.copy`), falling back to a generic message.
fn rejection_reason(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.pointer("/error/vError/copy"))
        .and_then(|c| c.as_str())
        .unwrap_or("invalid credentials")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::default()
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_plain_success_body_is_accepted() {
        let outcome =
            interpret_login_response(StatusCode::OK, r#"{"sUser": {"userId": 7}}"#, &config());
        assert!(matches!(outcome, LoginOutcome::Accepted));
    }

    #[test]
    fn test_challenge_marker_requires_mfa() {
        let body = r#"{"challenge": {"channel": "email", "deliveredTo": "u***@example.com"}}"#;
        match interpret_login_response(StatusCode::OK, body, &config()) {
            LoginOutcome::MfaRequired(challenge) => assert_eq!(challenge.channel(), "email"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_challenge_without_channel_defaults_to_email() {
        let body = r#"{"challenge": {}}"#;
        match interpret_login_response(StatusCode::OK, body, &config()) {
            LoginOutcome::MfaRequired(challenge) => assert_eq!(challenge.channel(), "email"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_error_envelope_is_rejected_with_reason() {
        let body = r#"{"error": {"vError": {"copy": "Hmm. That password doesn't look right."}}}"#;
        match interpret_login_response(StatusCode::OK, body, &config()) {
            LoginOutcome::Rejected(reason) => assert!(reason.contains("password")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_unauthorized_status_is_rejected() {
        let outcome = interpret_login_response(StatusCode::UNAUTHORIZED, "", &config());
        match outcome {
            LoginOutcome::Rejected(reason) => assert_eq!(reason, "invalid credentials"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
