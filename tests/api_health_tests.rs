//! 健康检查与通用中间件集成测试

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};

mod common;
use common::{body_json, TestApp};

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
    assert!(json["uptime_secs"].is_number());
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header(header::AUTHORIZATION, "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trace_id_echoed() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.headers().get("x-trace-id").unwrap(), "trace-abc");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_cors_preflight_allowed_origin() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/auth/login")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_unknown_origin_not_allowed() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = TestApp::new();

    let response = app
        .send(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
}

#[tokio::test]
async fn test_unknown_route_with_token_not_found() {
    let app = TestApp::new();
    let token = app.login("demo", "demo123").await;

    for uri in ["/nope", "/auth/unknown", "/image/other"] {
        let response = app
            .send(
                Request::builder()
                    .uri(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/does/not/exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
