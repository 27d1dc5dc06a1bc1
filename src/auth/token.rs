//! Hidden-token discovery.
//!
//! The backend never hands out the authentication token directly: it is
//! embedded in browser-rendered pages as a JSON blob inside the
//! `javascript-user` input element, and occasionally appears as a plain
//! `token` field in JSON responses. This module knows both shapes and
//! nothing else - a missing marker is `TokenNotFound`, which callers must
//! treat as a retryable authentication failure (stale page layout or an
//! unauthenticated response), never as a crash.

use scraper::{Html, Selector};

use crate::api::ApiError;

/// CSS selector for the element carrying the token payload.
const TOKEN_SELECTOR: &str = "input#javascript-user";

/// Extract the hidden authentication token from a raw HTML or JSON
/// document. Pure parsing; no side effects.
pub fn extract_token(document: &str) -> Result<String, ApiError> {
    token_from_json(document)
        .or_else(|| token_from_html(document))
        .ok_or(ApiError::TokenNotFound)
}

/// JSON responses carry the token either at the top level or nested under
/// the user object (`sUser`).
fn token_from_json(document: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(document.trim()).ok()?;
    let token = value
        .get("token")
        .or_else(|| value.get("sUser").and_then(|u| u.get("token")))?;
    let token = token.as_str()?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// HTML pages embed a JSON user object in the `value` attribute of the
/// `javascript-user` input; the attribute is entity-escaped in the page
/// source and unescaped by the parser.
fn token_from_html(document: &str) -> Option<String> {
    let html = Html::parse_document(document);
    let selector = Selector::parse(TOKEN_SELECTOR).ok()?;
    let element = html.select(&selector).next()?;
    let payload = element.value().attr("value")?;
    let user: serde_json::Value = serde_json::from_str(payload).ok()?;
    let token = user.get("token")?.as_str()?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
