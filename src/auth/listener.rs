//! One-shot local HTTP listener for out-of-band code delivery.
//!
//! An external relay (e.g. an email-forwarding rule) is pointed at
//! `http://host:port/{url_keyword}?{code}`. The listener accepts inbound
//! requests until one matches that shape, answers it with an empty 200,
//! and resolves with the query string as the code. Non-matching requests
//! get a 404 and the wait continues. The whole call is bounded by the
//! caller's timeout and the socket is released on every exit path.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::api::ApiError;
use crate::auth::mfa::CodeProvider;

const MATCH_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const NO_MATCH_RESPONSE: &[u8] =
    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// A single-use listener that blocks until a matching request delivers a
/// code, or the timeout elapses with `ListenTimeout`.
#[derive(Debug, Clone)]
pub struct EphemeralCodeListener {
    port: u16,
    url_keyword: String,
    timeout: Duration,
}

impl EphemeralCodeListener {
    pub fn new(port: u16, url_keyword: impl Into<String>, timeout: Duration) -> Self {
        Self {
            port,
            url_keyword: url_keyword.into(),
            timeout,
        }
    }

    /// Bind, wait for one matching request, and return its code.
    ///
    /// Exactly one accept loop runs per invocation and the call blocks the
    /// invoking task until resolution. The bound socket is dropped when
    /// this future resolves - success, timeout, or error alike.
    pub async fn listen(&self) -> Result<String, ApiError> {
        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;
        info!(port = self.port, keyword = %self.url_keyword, "Waiting for code delivery");

        match tokio::time::timeout(self.timeout, self.accept_until_match(&listener)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(timeout = ?self.timeout, "Listener timed out");
                Err(ApiError::ListenTimeout)
            }
        }
    }

    async fn accept_until_match(&self, listener: &TcpListener) -> Result<String, ApiError> {
        loop {
            let (stream, peer) = listener.accept().await?;
            match self.handle_connection(stream).await? {
                Some(code) => {
                    info!(%peer, "Code received");
                    return Ok(code);
                }
                None => debug!(%peer, "Ignored non-matching request"),
            }
        }
    }

    /// Read one request line; answer and report whether it matched.
    async fn handle_connection(&self, stream: TcpStream) -> Result<Option<String>, ApiError> {
        let mut stream = BufReader::new(stream);
        let mut request_line = String::new();
        stream.read_line(&mut request_line).await?;

        match self.match_request_line(&request_line) {
            Some(code) => {
                stream.get_mut().write_all(MATCH_RESPONSE).await?;
                let _ = stream.get_mut().shutdown().await;
                Ok(Some(code))
            }
            None => {
                stream.get_mut().write_all(NO_MATCH_RESPONSE).await?;
                let _ = stream.get_mut().shutdown().await;
                Ok(None)
            }
        }
    }

    /// Match `GET /{url_keyword}?{code}` and pull out the code.
    fn match_request_line(&self, line: &str) -> Option<String> {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("GET") {
            return None;
        }
        let target = parts.next()?;
        let (path, query) = target.split_once('?')?;
        if path.strip_prefix('/')? != self.url_keyword || query.is_empty() {
            return None;
        }
        Some(query.to_string())
    }
}

impl CodeProvider for EphemeralCodeListener {
    async fn obtain(&self) -> Result<String, ApiError> {
        self.listen().await
    }
}
