//! Retry behaviour of the reqwest transport against a local mock server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use snapfetch_fetch::{FetchError, Fetcher, HttpClient, Transport, TransportOptions};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_transport(retries: u32) -> Transport {
    let options = TransportOptions::default()
        .total_retries(retries)
        .backoff_factor(Duration::from_millis(1))
        .max_backoff(Duration::from_millis(5))
        .timeout(Duration::from_secs(5));
    Transport::new(options).unwrap()
}

#[tokio::test]
async fn test_success_first_try() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&server)
        .await;

    let res = fast_transport(3).get(&format!("{}/ok", server.uri())).await.unwrap();

    assert_eq!(res.status, 200);
    assert_eq!(&res.body[..], b"hello");
}

#[tokio::test]
async fn test_retry_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let res = fast_transport(5).get(&format!("{}/flaky", server.uri())).await.unwrap();

    assert_eq!(res.status, 200);
    assert_eq!(&res.body[..], b"recovered");
}

#[tokio::test]
async fn test_exhausted_retries_return_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4) // 1 initial + 3 retries
        .mount(&server)
        .await;

    let res = fast_transport(3).get(&format!("{}/down", server.uri())).await.unwrap();

    assert_eq!(res.status, 500);
    assert!(!res.is_success());
}

#[tokio::test]
async fn test_forbidden_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let res = fast_transport(2).get(&format!("{}/forbidden", server.uri())).await.unwrap();
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let res = fast_transport(5).get(&format!("{}/missing", server.uri())).await.unwrap();
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_connection_refused_surfaces_after_retries() {
    // Bind and drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let err = fast_transport(2)
        .get(&format!("http://127.0.0.1:{port}/nothing"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn test_stream_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let err = match fast_transport(1).stream(&format!("{}/gone", server.uri())).await {
        Ok(_) => panic!("expected a status error"),
        Err(e) => e,
    };
    assert_eq!(err.status(), Some(410));
}

#[tokio::test]
async fn test_stalled_stream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stalled.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 16]).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let transport = Transport::new(TransportOptions::default().total_retries(0).timeout(Duration::from_secs(1))).unwrap();
    let started = Instant::now();
    let res = transport.stream(&format!("{}/stalled.zip", server.uri())).await;

    assert!(matches!(res, Err(FetchError::Request { .. })));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_stalled_get_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stalled.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}").set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let transport = Transport::new(TransportOptions::default().total_retries(0).timeout(Duration::from_secs(1))).unwrap();
    let err = transport.get(&format!("{}/stalled.json", server.uri())).await.unwrap_err();

    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn test_fetcher_streams_to_disk() {
    let server = MockServer::start().await;
    let payload = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/chrome.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let dest = dir.path().join("Downloads").join("linux").join("1.2.3.4").join("chrome.zip");
    let fetcher = Fetcher::new(Arc::new(fast_transport(1)));

    let written = fetcher
        .fetch(&format!("{}/chrome.zip", server.uri()), &dest)
        .await
        .unwrap();

    assert_eq!(written, payload.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}
