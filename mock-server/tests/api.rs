use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_timer, lock, ServeTimer, SharedRegistry, TestCase};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("X-NSONE-Key", "secret")
        .body(body.to_string())
        .unwrap()
}

fn registry_with(cases: Vec<TestCase>) -> SharedRegistry {
    let registry = SharedRegistry::default();
    lock(&registry).add_test_cases(cases).unwrap();
    registry
}

// --- matching ---

#[tokio::test]
async fn registered_case_is_replayed() {
    let registry = registry_with(vec![TestCase::new("GET", "zones")
        .request_header("X-NSONE-Key", "secret")
        .response_header("Content-Type", "application/json")
        .response_body(json!([{"zone": "a.com"}, {"zone": "b.com"}]))]);

    let resp = app(registry)
        .oneshot(json_request("GET", "/v1/zones", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    let zones: Value = body_json(resp).await;
    assert_eq!(zones, json!([{"zone": "a.com"}, {"zone": "b.com"}]));
}

#[tokio::test]
async fn body_selects_between_cases() {
    let registry = registry_with(vec![
        TestCase::new("PUT", "zones/a.com")
            .request_body(json!({"zone": "a.com", "ttl": 60}))
            .response_body("sixty"),
        TestCase::new("PUT", "zones/a.com")
            .request_body(json!({"zone": "a.com", "ttl": 120}))
            .status(201)
            .response_body("one-twenty"),
    ]);

    let resp = app(registry.clone())
        .oneshot(json_request("PUT", "/v1/zones/a.com", r#"{"ttl":120,"zone":"a.com"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_bytes(resp).await, "one-twenty");

    let resp = app(registry)
        .oneshot(json_request("PUT", "/v1/zones/a.com", r#"{"zone":"a.com","ttl":60}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "sixty");
}

#[tokio::test]
async fn multi_value_headers_are_written() {
    let registry = registry_with(vec![TestCase::new("GET", "zones")
        .response_header("Link", r#"<http://localhost/v1/zones?page=2>; rel="next""#)
        .response_header("Link", r#"<http://localhost/v1/zones?page=9>; rel="last""#)
        .response_body("[]")]);

    let resp = app(registry)
        .oneshot(json_request("GET", "/v1/zones", ""))
        .await
        .unwrap();
    let links: Vec<_> = resp.headers().get_all("link").iter().collect();
    assert_eq!(links.len(), 2);
}

// --- unmatched ---

#[tokio::test]
async fn unknown_method_is_tagged() {
    let registry = registry_with(vec![TestCase::new("GET", "zones")]);
    let resp = app(registry)
        .oneshot(json_request("DELETE", "/v1/zones", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["reason"], "method");
}

#[tokio::test]
async fn unknown_uri_is_tagged() {
    let registry = registry_with(vec![TestCase::new("GET", "zones")]);
    let resp = app(registry)
        .oneshot(json_request("GET", "/v1/zones/a.com", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["reason"], "uri");
}

#[tokio::test]
async fn mismatched_headers_are_tagged_no_test() {
    let registry = registry_with(vec![TestCase::new("GET", "zones").request_header("X-NSONE-Key", "other")]);
    let resp = app(registry)
        .oneshot(json_request("GET", "/v1/zones", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["reason"], "no test");
    assert!(body["message"].as_str().unwrap().contains("/v1/zones"));
}

#[tokio::test]
async fn non_utf8_header_values_are_not_matched() {
    let registry = registry_with(vec![TestCase::new("GET", "zones")
        .request_header("X-Bin", "abc")
        .response_body("[]")]);
    let request = |value: &[u8]| {
        Request::builder()
            .uri("/v1/zones")
            .header("X-Bin", http::HeaderValue::from_bytes(value).unwrap())
            .body(String::new())
            .unwrap()
    };

    let resp = app(registry.clone()).oneshot(request(&b"abc"[..])).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app(registry).oneshot(request(&b"ab\xff"[..])).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["reason"], "no test");
}

#[tokio::test]
async fn non_utf8_header_does_not_hide_other_headers() {
    let registry = registry_with(vec![TestCase::new("GET", "zones")
        .request_header("X-NSONE-Key", "secret")
        .response_body("[]")]);
    let request = Request::builder()
        .uri("/v1/zones")
        .header("X-NSONE-Key", "secret")
        .header("X-Bin", http::HeaderValue::from_bytes(b"\xfe\xff").unwrap())
        .body(String::new())
        .unwrap();

    let resp = app(registry).oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- registry lifecycle ---

#[tokio::test]
async fn cleared_registry_serves_nothing() {
    let registry = registry_with(vec![TestCase::new("GET", "zones")]);
    lock(&registry).clear();

    let resp = app(registry)
        .oneshot(json_request("GET", "/v1/zones", ""))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["reason"], "method");
}

#[derive(Default)]
struct CountingTimer {
    stops: AtomicUsize,
    starts: AtomicUsize,
}

impl ServeTimer for CountingTimer {
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn timer_is_paused_around_each_request() {
    use tower::Service;

    let timer = Arc::new(CountingTimer::default());
    let registry = registry_with(vec![TestCase::new("GET", "zones")]);
    let mut app = app_with_timer(registry, Some(timer.clone())).into_service();

    for uri in ["/v1/zones", "/v1/unknown"] {
        ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request("GET", uri, ""))
            .await
            .unwrap();
    }

    assert_eq!(timer.stops.load(Ordering::SeqCst), 2);
    assert_eq!(timer.starts.load(Ordering::SeqCst), 2);
}
