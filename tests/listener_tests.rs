//! Integration tests for the ephemeral code listener over real sockets.

use std::time::Duration;

use mintsync::{ApiError, EphemeralCodeListener};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Issue one GET against the listener and return the raw response.
/// Retries the connect briefly so a just-spawned listener has time to
/// bind.
async fn send_request(port: u16, target: &str) -> String {
    let mut stream = loop {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    };
    stream
        .write_all(format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_matching_request_resolves_with_code() {
    let listener = EphemeralCodeListener::new(2222, "mintcode", Duration::from_secs(1));
    let waiting = tokio::spawn(async move { listener.listen().await });

    let response = send_request(2222, "/mintcode?123456").await;
    assert!(response.starts_with("HTTP/1.1 200"));

    let code = waiting.await.unwrap().unwrap();
    assert_eq!(code, "123456");
}

#[tokio::test]
async fn test_times_out_around_the_window() {
    let listener = EphemeralCodeListener::new(2223, "mintcode", Duration::from_secs(1));
    let started = tokio::time::Instant::now();

    let err = listener.listen().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, ApiError::ListenTimeout));
    // Approximately one second: not before, not much after.
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1_800));
}

#[tokio::test]
async fn test_non_matching_requests_do_not_resolve() {
    let listener = EphemeralCodeListener::new(2224, "mintcode", Duration::from_secs(3));
    let waiting = tokio::spawn(async move { listener.listen().await });

    // Wrong keyword, then a matching path with no code: both ignored.
    let response = send_request(2224, "/wrongcode?111111").await;
    assert!(response.starts_with("HTTP/1.1 404"));
    let response = send_request(2224, "/mintcode").await;
    assert!(response.starts_with("HTTP/1.1 404"));

    let response = send_request(2224, "/mintcode?654321").await;
    assert!(response.starts_with("HTTP/1.1 200"));

    let code = waiting.await.unwrap().unwrap();
    assert_eq!(code, "654321");
}

#[tokio::test]
async fn test_socket_is_released_after_timeout() {
    let listener = EphemeralCodeListener::new(2225, "mintcode", Duration::from_millis(100));
    let err = listener.listen().await.unwrap_err();
    assert!(matches!(err, ApiError::ListenTimeout));

    // The port is free again: a second single-use listener binds and
    // serves on it immediately.
    let listener = EphemeralCodeListener::new(2225, "mintcode", Duration::from_secs(1));
    let waiting = tokio::spawn(async move { listener.listen().await });
    send_request(2225, "/mintcode?777777").await;
    assert_eq!(waiting.await.unwrap().unwrap(), "777777");
}
