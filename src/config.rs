//! Client configuration.
//!
//! `ClientConfig` collects the knobs that vary between environments: the
//! backend base URL (overridable so tests can point at a local mock
//! server), the browser user-agent the backend expects, and the timeout
//! policies for requests and for waiting on a two-factor code.

use std::time::Duration;

/// Production base URL of the backend.
pub const MINT_ROOT_URL: &str = "https://mint.intuit.com";

/// The backend serves browser traffic; a desktop-browser user-agent keeps
/// responses consistent with what the token extractor expects.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP request timeout in seconds.
/// 30s allows for slow backend responses while still failing fast.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How long a login attempt waits for a two-factor code before giving up.
const MFA_CODE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Upper bound on the code-provider wait during MFA resolution.
    pub mfa_code_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: MINT_ROOT_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            mfa_code_timeout: Duration::from_secs(MFA_CODE_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Join a backend path onto the base URL.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_handles_trailing_slash() {
        let config = ClientConfig::with_base_url("http://localhost:1234/");
        assert_eq!(
            config.url("overview.event"),
            "http://localhost:1234/overview.event"
        );
    }

    #[test]
    fn test_default_points_at_production() {
        let config = ClientConfig::default();
        assert_eq!(
            config.url("userStatus.xevent"),
            format!("{}/userStatus.xevent", MINT_ROOT_URL)
        );
    }
}
