use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Login rejected: {0}")]
    AuthRejected(String),

    #[error("Verification code rejected by the backend")]
    MfaRejected,

    #[error("Verification code unavailable: {0}")]
    CodeUnavailable(String),

    #[error("No matching request arrived before the listener timeout")]
    ListenTimeout,

    #[error("Authentication token not found in response")]
    TokenNotFound,

    #[error("Session expired - re-authenticate to continue")]
    SessionExpired,

    #[error("Not authenticated - call login first")]
    NotAuthenticated,

    #[error("Another login attempt is already in progress")]
    LoginInProgress,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => ApiError::SessionExpired,
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether a caller (e.g. a scheduled job) may reasonably retry later,
    /// as opposed to needing a human to fix credentials or codes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::CodeUnavailable(_)
                | ApiError::ListenTimeout
                | ApiError::TokenNotFound
                | ApiError::SessionExpired
                | ApiError::LoginInProgress
                | ApiError::ServerError(_)
                | ApiError::Network(_)
                | ApiError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_auth_codes_to_session_expired() {
        let err = ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, ApiError::SessionExpired));
        let err = ApiError::from_status(reqwest::StatusCode::FORBIDDEN, "denied");
        assert!(matches!(err, ApiError::SessionExpired));
    }

    #[test]
    fn test_from_status_truncates_long_bodies() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        match err {
            ApiError::ServerError(msg) => {
                assert!(msg.contains("truncated"));
                assert!(msg.len() < 600);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_retryable_split_matches_alerting_policy() {
        assert!(!ApiError::AuthRejected("bad password".into()).is_retryable());
        assert!(!ApiError::MfaRejected.is_retryable());
        assert!(ApiError::ListenTimeout.is_retryable());
        assert!(ApiError::SessionExpired.is_retryable());
    }
}
