//! Common test utilities for mintsync integration tests.
//!
//! Provides a mock backend (wiremock) wired to a `MintClient`, plus the
//! canned login/MFA/overview responses the flows need.

// Allow dead code: each test binary compiles this module and uses a
// different subset of the helpers.
#![allow(dead_code)]

use std::time::Duration;

use mintsync::{ApiError, ClientConfig, CodeProvider, MintClient};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Token embedded in the mock overview page.
pub const TEST_TOKEN: &str = "test-token-8c4f";

pub struct TestContext {
    pub server: MockServer,
    pub client: MintClient,
}

impl TestContext {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let mut config = ClientConfig::with_base_url(server.uri());
        // Keep MFA waits short so failure paths do not stall the suite.
        config.mfa_code_timeout = Duration::from_secs(2);
        let client = MintClient::with_config(config).expect("client construction");
        Self { server, client }
    }

    /// Overview page carrying the hidden token the way the backend
    /// renders it: JSON in an entity-escaped `value` attribute.
    pub fn overview_html(token: &str) -> String {
        format!(
            "<html><body>\
             <input type=\"hidden\" id=\"javascript-user\" \
             value=\"{{&quot;token&quot;: &quot;{token}&quot;, &quot;userId&quot;: 42}}\"/>\
             </body></html>"
        )
    }

    pub async fn mock_overview(&self) {
        Mock::given(method("GET"))
            .and(path("/overview.event"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "mint_overview=ov1; Path=/")
                    .set_body_string(Self::overview_html(TEST_TOKEN)),
            )
            .mount(&self.server)
            .await;
    }

    /// Credential POST accepted outright, no challenge.
    pub async fn mock_login_accepted(&self) {
        Mock::given(method("POST"))
            .and(path("/loginUserSubmit.xevent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "mint_session=abc123; Path=/; HttpOnly")
                    .set_body_json(json!({"sUser": {"userId": 42}})),
            )
            .mount(&self.server)
            .await;
    }

    /// Credential POST answered with a pending email challenge.
    pub async fn mock_login_mfa_required(&self) {
        Mock::given(method("POST"))
            .and(path("/loginUserSubmit.xevent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "mint_session=abc123; Path=/; HttpOnly")
                    .set_body_json(json!({
                        "challenge": {"channel": "email", "deliveredTo": "u***@example.com"}
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Credential POST rejected with the backend's error envelope.
    pub async fn mock_login_rejected(&self) {
        Mock::given(method("POST"))
            .and(path("/loginUserSubmit.xevent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"vError": {"copy": "Hmm. That password doesn't look right."}}
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_challenge_request(&self) {
        Mock::given(method("POST"))
            .and(path("/loginChallengeRequest.xevent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_challenge_submit_accepted(&self) {
        Mock::given(method("POST"))
            .and(path("/loginChallengeSubmit.xevent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "ius_mfa=verified; Path=/")
                    .set_body_json(json!({})),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_challenge_submit_rejected(&self) {
        Mock::given(method("POST"))
            .and(path("/loginChallengeSubmit.xevent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"vError": {"copy": "That code didn't work."}}
            })))
            .mount(&self.server)
            .await;
    }

    /// Run a full MFA-free login against the mocks.
    pub async fn login(&self) {
        self.mock_login_accepted().await;
        self.mock_overview().await;
        let credentials = mintsync::Credentials::new("user@example.com", "hunter2");
        self.client
            .login(&credentials, &NeverCalled)
            .await
            .expect("mock login");
    }
}

/// Provider that yields a fixed code.
pub struct StaticCode(pub &'static str);

impl CodeProvider for StaticCode {
    async fn obtain(&self) -> Result<String, ApiError> {
        Ok(self.0.to_string())
    }
}

/// Provider that fails as a timed-out listener would.
pub struct UnavailableCode;

impl CodeProvider for UnavailableCode {
    async fn obtain(&self) -> Result<String, ApiError> {
        Err(ApiError::CodeUnavailable("relay never delivered".into()))
    }
}

/// Provider for flows that must not reach MFA at all.
pub struct NeverCalled;

impl CodeProvider for NeverCalled {
    async fn obtain(&self) -> Result<String, ApiError> {
        panic!("code provider invoked in a flow without a challenge");
    }
}

/// Responder for the bundled service controller: echoes the request id
/// from the submitted `input` form field, the way the real backend keys
/// its response envelope.
pub struct ServiceResponder {
    payload: serde_json::Value,
}

impl ServiceResponder {
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }
}

impl Respond for ServiceResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = String::from_utf8_lossy(&request.body);
        let input = url::form_urlencoded::parse(body.as_bytes())
            .find(|(key, _)| key == "input")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let requests: serde_json::Value =
            serde_json::from_str(&input).unwrap_or_else(|_| json!([]));
        let id = requests[0]["id"].as_str().unwrap_or("0").to_string();

        let mut envelope = serde_json::Map::new();
        envelope.insert(id, json!({ "response": self.payload.clone() }));
        ResponseTemplate::new(200).set_body_json(json!({ "response": envelope }))
    }
}
