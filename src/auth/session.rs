//! Session state: the cookie store and hidden token that authenticate
//! every subsequent request.
//!
//! A `Session` is produced by a completed login (or built directly from an
//! existing browser session via [`Session::from_parts`]) and replaced
//! wholesale by the next login. It is deliberately not serializable:
//! nothing outlives the process.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

use crate::api::ApiError;
use crate::auth::token::extract_token;
use crate::config::ClientConfig;

/// Path of the page the token is scraped from after authentication.
const OVERVIEW_PATH: &str = "overview.event";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub value: String,
    pub domain: Option<String>,
}

/// Name-keyed cookie store accumulated over a login attempt.
///
/// The backend scopes its session cookies to one domain, so a flat
/// name-to-value map with an optional recorded domain is all the client
/// needs; later Set-Cookie headers for the same name replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieStore {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every `Set-Cookie` header from a response into the store.
    pub(crate) fn absorb(&mut self, headers: &HeaderMap) {
        for header in headers.get_all(SET_COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            if let Some((name, cookie)) = parse_set_cookie(raw) {
                self.cookies.insert(name, cookie);
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(
            name.into(),
            Cookie {
                value: value.into(),
                domain: None,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|c| c.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Render the store as a `Cookie` request header value.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, cookie)| format!("{}={}", name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Parse one `Set-Cookie` header into a (name, cookie) pair. Attributes
/// other than `Domain` are dropped; expiry is the backend's problem.
fn parse_set_cookie(raw: &str) -> Option<(String, Cookie)> {
    let mut segments = raw.split(';');
    let (name, value) = segments.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let domain = segments.find_map(|attr| {
        let (key, val) = attr.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("domain")
            .then(|| val.trim().to_string())
    });
    Some((
        name.to_string(),
        Cookie {
            value: value.trim().to_string(),
            domain,
        },
    ))
}

#[derive(Debug, Clone)]
pub struct Session {
    cookies: CookieStore,
    token: String,
    authenticated: bool,
}

impl Session {
    pub(crate) fn new(cookies: CookieStore, token: String) -> Self {
        Self {
            cookies,
            token,
            authenticated: true,
        }
    }

    /// Build a session from an externally obtained token and cookie set,
    /// e.g. lifted out of a logged-in browser. No network traffic; the
    /// session is trusted until the backend says otherwise.
    pub fn from_parts(
        token: impl Into<String>,
        cookies: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut store = CookieStore::new();
        for (name, value) in cookies {
            store.insert(name, value);
        }
        Self {
            cookies: store,
            token: token.into(),
            authenticated: true,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) fn mark_expired(&mut self) {
        self.authenticated = false;
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    pub fn cookie_header(&self) -> String {
        self.cookies.header_value()
    }
}

/// Final step of every successful login path: fetch the overview page with
/// the cookies accumulated so far, pull the hidden token out of it, and
/// assemble the authenticated session.
pub(crate) async fn establish(
    http: &reqwest::Client,
    config: &ClientConfig,
    mut cookies: CookieStore,
) -> Result<Session, ApiError> {
    let response = http
        .get(config.url(OVERVIEW_PATH))
        .header(reqwest::header::COOKIE, cookies.header_value())
        .send()
        .await?;

    cookies.absorb(response.headers());
    let body = response.text().await?;
    let token = extract_token(&body)?;

    debug!(cookies = cookies.len(), "Session established");
    Ok(Session::new(cookies, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_absorb_collects_and_replaces_cookies() {
        let mut store = CookieStore::new();
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("mint_session=abc; Path=/; HttpOnly"),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("ius_token=xyz; Domain=.intuit.com; Secure"),
        );
        store.absorb(&headers);

        assert_eq!(store.get("mint_session"), Some("abc"));
        assert_eq!(store.get("ius_token"), Some("xyz"));
        assert_eq!(store.len(), 2);

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("mint_session=def"));
        store.absorb(&headers);
        assert_eq!(store.get("mint_session"), Some("def"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_set_cookie_domain_attribute_is_kept() {
        let (name, cookie) = parse_set_cookie("sid=1; Domain=.intuit.com; Path=/").unwrap();
        assert_eq!(name, "sid");
        assert_eq!(cookie.value, "1");
        assert_eq!(cookie.domain.as_deref(), Some(".intuit.com"));
    }

    #[test]
    fn test_malformed_set_cookie_is_ignored() {
        assert!(parse_set_cookie("no-equals-sign").is_none());
        assert!(parse_set_cookie("=value-without-name").is_none());
    }

    #[test]
    fn test_header_value_joins_pairs() {
        let mut store = CookieStore::new();
        store.insert("a", "1");
        store.insert("b", "2");
        assert_eq!(store.header_value(), "a=1; b=2");
    }

    #[test]
    fn test_from_parts_builds_authenticated_session() {
        let session = Session::from_parts(
            "tok",
            vec![("mint_session".to_string(), "abc".to_string())],
        );
        assert!(session.is_authenticated());
        assert_eq!(session.token(), "tok");
        assert_eq!(session.cookies().get("mint_session"), Some("abc"));
    }

    #[test]
    fn test_mark_expired_flips_authenticated() {
        let mut session = Session::from_parts("tok", vec![]);
        session.mark_expired();
        assert!(!session.is_authenticated());
    }
}
