use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_method_headers_and_body() {
    let req = Request::builder()
        .method("PUT")
        .uri("/echo?x=1")
        .header(http::header::CONTENT_TYPE, "text/plain")
        .header("x-multi", "a")
        .header("x-multi", "b")
        .body("payload".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.path, "/echo?x=1");
    assert_eq!(echo.body, "payload");
    assert_eq!(echo.headers["x-multi"], vec!["a", "b"]);
}

// --- status ---

#[tokio::test]
async fn status_route_returns_requested_code() {
    let resp = app().oneshot(get("/status/418")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_bytes(resp).await, "status 418");
}

#[tokio::test]
async fn status_route_rejects_invalid_code() {
    let resp = app().oneshot(get("/status/1000")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- delay ---

#[tokio::test]
async fn delay_route_answers_after_sleeping() {
    let resp = app().oneshot(get("/delay/5")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "slept 5");
}

// --- headers ---

#[tokio::test]
async fn multi_header_route_repeats_header() {
    let resp = app().oneshot(get("/headers/multi")).await.unwrap();
    let values: Vec<_> = resp
        .headers()
        .get_all("x-custom")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["a", "b"]);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain");
}

// --- redirect ---

#[tokio::test]
async fn redirect_route_counts_down() {
    let resp = app().oneshot(get("/redirect/2")).await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()[http::header::LOCATION], "/redirect/1");

    let resp = app().oneshot(get("/redirect/0")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "arrived");
}

// --- chunked ---

#[tokio::test]
async fn chunked_route_streams_whole_body() {
    let resp = app().oneshot(get("/chunked")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "hello chunked world");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app().oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
