mod common;

use axum::http::StatusCode;
use common::{build_test_app, expect_json, get, post_json, upload_capture};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn summary_omits_dom_and_defaults_draft(pool: PgPool) {
    let app = build_test_app(pool);
    let id = upload_capture(&app.router, "https://app.example.com/page").await;

    let json = expect_json(get(&app.router, &format!("/api/screenshot/{id}")).await, StatusCode::OK).await;
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["tabUrl"], "https://app.example.com/page");
    assert_eq!(json["tempComment"], "");
    assert!(json.get("domTree").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_and_malformed_ids_are_404(pool: PgPool) {
    let app = build_test_app(pool);

    for uri in [
        "/api/screenshot/00000000-0000-4000-8000-000000000000",
        "/api/screenshot/not-a-uuid",
        "/api/screenshot/not-a-uuid/temp-comment",
    ] {
        let json = expect_json(get(&app.router, uri).await, StatusCode::NOT_FOUND).await;
        assert_eq!(json["code"], "NOT_FOUND", "{uri}");
    }

    let response = post_json(
        &app.router,
        "/api/screenshot/00000000-0000-4000-8000-000000000000/temp-comment",
        json!({ "tempComment": "draft" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Draft comments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn draft_comment_round_trip_and_clear(pool: PgPool) {
    let app = build_test_app(pool);
    let id = upload_capture(&app.router, "https://app.example.com").await;
    let uri = format!("/api/screenshot/{id}/temp-comment");

    let json = expect_json(get(&app.router, &uri).await, StatusCode::OK).await;
    assert_eq!(json["tempComment"], "");

    let json = expect_json(
        post_json(&app.router, &uri, json!({ "tempComment": "half-written" })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["tempComment"], "half-written");
    assert!(json["updatedAt"].is_string());

    let json = expect_json(get(&app.router, &uri).await, StatusCode::OK).await;
    assert_eq!(json["tempComment"], "half-written");

    let json = expect_json(post_json(&app.router, &uri, json!({ "tempComment": "" })).await, StatusCode::OK).await;
    assert_eq!(json["tempComment"], "");

    let json = expect_json(get(&app.router, &format!("/api/screenshot/{id}")).await, StatusCode::OK).await;
    assert_eq!(json["tempComment"], "");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn draft_comment_must_be_a_string(pool: PgPool) {
    let app = build_test_app(pool);
    let id = upload_capture(&app.router, "https://app.example.com").await;
    let uri = format!("/api/screenshot/{id}/temp-comment");

    for body in [json!({}), json!({ "tempComment": 5 })] {
        let response = post_json(&app.router, &uri, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
