//! Shared helpers for API integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use feedback_api::auth::jwt::{Claims, JwtConfig};
use feedback_api::config::{ServerConfig, DEFAULT_BODY_LIMIT_BYTES, DEFAULT_DEDUP_WINDOW_SECS};
use feedback_api::router::build_app_router;
use feedback_api::state::AppState;
use feedback_core::error_log::{ErrorLogBuffer, EvictionPolicy, DEFAULT_CAPACITY};
use feedback_core::timestamps::display_offset;
use feedback_notify::NotifyConfig;
use feedback_pipeline::{NotificationPipeline, PipelineAdapters, PipelineSettings};
use feedback_storage::{LocalStore, ObjectStore};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::PgPool;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-with-enough-bytes";
pub const ADMIN_ORIGIN: &str = "http://admin.example.test";
pub const PUBLIC_BASE_URL: &str = "http://localhost:3300";

/// Tiny PNG-ish payload; storage only cares that it is valid base64.
pub const SCREENSHOT_DATA_URL: &str = "data:image/png;base64,aGVsbG8=";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cors_origins: vec![ADMIN_ORIGIN.into()],
        request_timeout_secs: 30,
        body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        jwt: JwtConfig::with_secret(JWT_SECRET),
        list_requires_power_user: false,
        dedup_window_secs: DEFAULT_DEDUP_WINDOW_SECS,
        error_log_capacity: DEFAULT_CAPACITY,
        embedded_worker: false,
        display_offset: display_offset(9),
    }
}

pub fn disabled_pipeline() -> NotificationPipeline {
    pipeline_for(&NotifyConfig::disabled())
}

pub fn pipeline_for(config: &NotifyConfig) -> NotificationPipeline {
    NotificationPipeline::new(PipelineAdapters::from_config(config), PipelineSettings::default())
}

/// A running app plus the upload directory backing it.
pub struct TestApp {
    pub router: Router,
    pub uploads: TempDir,
}

pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, test_config(), disabled_pipeline())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig, pipeline: NotificationPipeline) -> TestApp {
    let uploads = tempfile::tempdir().expect("create uploads dir");
    let store = ObjectStore::local_only(LocalStore::new(uploads.path(), PUBLIC_BASE_URL));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        error_logs: Arc::new(Mutex::new(ErrorLogBuffer::new(
            config.error_log_capacity,
            EvictionPolicy::DropOldest,
        ))),
        pipeline,
        store: Arc::new(store),
        worker_wake: Arc::new(Notify::new()),
    };

    TestApp {
        router: build_app_router(state, &config),
        uploads,
    }
}

/// Bearer token signed with [`JWT_SECRET`].
pub fn token_with_role(role: &str) -> String {
    let claims = Claims {
        sub: "tester".into(),
        role: Some(role.into()),
        exp: Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request failed")
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_with_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn json_request(app: &Router, method: Method, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn patch_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::PATCH, uri, body).await
}

pub async fn put_bytes(app: &Router, uri: &str, bytes: &'static [u8]) -> Response<Body> {
    let request = Request::put(uri)
        .header("content-type", "application/octet-stream")
        .body(Body::from(bytes))
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::delete(uri).body(Body::empty()).unwrap()).await
}

/// CORS preflight from `origin`.
pub async fn preflight(app: &Router, uri: &str, origin: &str, method: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(uri)
        .header("origin", origin)
        .header("access-control-request-method", method)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Assert the status and return the decoded body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Upload a capture through the API and return its id.
pub async fn upload_capture(app: &Router, url: &str) -> String {
    let response = post_json(
        app,
        "/api/feedback/upload-screenshot-dom",
        serde_json::json!({
            "screenshot": SCREENSHOT_DATA_URL,
            "domTree": "<html><body>captured</body></html>",
            "pageInfo": { "url": url, "title": "Captured page" },
            "timestamp": 1_734_944_285_000_i64,
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    json["id"].as_str().expect("capture id").to_string()
}

/// Submit feedback and return its id.
pub async fn submit(app: &Router, body: serde_json::Value) -> i64 {
    let json = expect_json(post_json(app, "/api/feedback", body).await, StatusCode::OK).await;
    json["id"].as_i64().expect("feedback id")
}
