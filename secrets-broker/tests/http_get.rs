use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::AUTHORIZATION};
use secrets_broker::AppState;
use secrets_broker::telemetry::CORRELATION_ID_HEADER;
use secrets_core::testing::{FakeKubeApi, service_account_token};
use secrets_core::{K8sDatabaseFactory, KubeResponse, Secret, SecretDatabase};
use serde_json::{Value, json};
use tower::ServiceExt;

struct Harness {
    app: Router,
    api: Arc<FakeKubeApi>,
}

async fn seeded() -> Harness {
    let api = Arc::new(FakeKubeApi::new());
    let factory = K8sDatabaseFactory::new(api.clone());
    secrets_core::DatabaseFactory::connect(&factory, &service_account_token("team-a"))
        .save(Secret::plain("x", "db-pass", "team-a", "hunter2"))
        .await
        .expect("seed secret");
    let app = secrets_broker::http::router(AppState::new(Arc::new(factory)));
    Harness { app, api }
}

fn get(path: &str, authorization: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn bearer(namespace: &str) -> Option<String> {
    Some(format!("Bearer {}", service_account_token(namespace)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn serves_secret_in_bound_namespace() {
    let harness = seeded().await;
    let (status, body) = send(
        &harness.app,
        get("/v1/secrets/team-a/db-pass", bearer("team-a")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.last(), Some(&b'\n'));
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json,
        json!({
            "id": "x",
            "name": "db-pass",
            "namespace": "team-a",
            "type": "plain",
            "value": "hunter2"
        })
    );
}

#[tokio::test]
async fn missing_or_short_authorization_is_rejected() {
    let harness = seeded().await;
    let before = harness.api.request_count();

    for authorization in [None, Some("Bearer".to_string()), Some("Bearer ".to_string())] {
        let (status, body) = send(
            &harness.app,
            get("/v1/secrets/team-a/db-pass", authorization),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"{}\n");
    }
    assert_eq!(harness.api.request_count(), before);
}

#[tokio::test]
async fn foreign_namespace_is_rejected_without_api_calls() {
    let harness = seeded().await;
    let before = harness.api.request_count();

    let (status, body) = send(
        &harness.app,
        get("/v1/secrets/team-a/db-pass", bearer("team-b")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"{}\n");
    assert_eq!(harness.api.request_count(), before);
}

#[tokio::test]
async fn unknown_secret_and_platform_failures_collapse_to_bad_request() {
    let harness = seeded().await;

    let (status, body) = send(
        &harness.app,
        get("/v1/secrets/team-a/missing", bearer("team-a")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"{}\n");

    harness.api.fail_next(KubeResponse {
        status: 500,
        body: b"internal".to_vec(),
    });
    let (status, body) = send(
        &harness.app,
        get("/v1/secrets/team-a/db-pass", bearer("team-a")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"{}\n");
}

#[tokio::test]
async fn undecodable_path_segment_returns_empty_object() {
    let harness = seeded().await;
    let before = harness.api.request_count();

    let (status, body) = send(
        &harness.app,
        get("/v1/secrets/team-a/%FF", bearer("team-a")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"{}\n");
    assert_eq!(harness.api.request_count(), before);
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let harness = seeded().await;
    let request = Request::builder()
        .uri("/v1/secrets/team-a/missing")
        .header(AUTHORIZATION, bearer("team-a").unwrap())
        .header(CORRELATION_ID_HEADER, "req-42")
        .body(Body::empty())
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[CORRELATION_ID_HEADER], "req-42");

    let response = harness
        .app
        .clone()
        .oneshot(get("/healthz", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
}
