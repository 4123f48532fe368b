mod common;

use axum::http::StatusCode;
use common::{build_test_app, expect_json, get, get_with_auth, post_json, token_with_role};
use serde_json::json;
use sqlx::PgPool;

async fn record(app: &axum::Router, source: &str, level: &str, message: &str) {
    let response = post_json(
        app,
        "/api/logs",
        json!({ "source": source, "level": level, "message": message }),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["success"], true);
    assert!(json["id"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_log_validates_fields(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(&app.router, "/api/logs", json!({ "source": "api", "level": "error" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app.router,
        "/api/logs",
        json!({ "source": "mainframe", "level": "error", "message": "boom" }),
    )
    .await;
    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let response = post_json(
        &app.router,
        "/api/logs",
        json!({ "source": "api", "level": "fatal", "message": "boom" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn listing_requires_power_user(pool: PgPool) {
    let app = build_test_app(pool);
    record(&app.router, "api", "error", "boom").await;

    let json = expect_json(get(&app.router, "/api/logs").await, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "FORBIDDEN");

    let response = get_with_auth(&app.router, "/api/logs", &token_with_role("USER")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_with_auth(&app.router, "/api/logs", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn power_user_sees_newest_first_with_filters(pool: PgPool) {
    let app = build_test_app(pool);
    record(&app.router, "chrome-extension", "error", "first").await;
    record(&app.router, "api", "warning", "second").await;
    record(&app.router, "chrome-extension", "info", "third").await;
    let token = token_with_role("POWER_USER");

    let json = expect_json(get_with_auth(&app.router, "/api/logs", &token).await, StatusCode::OK).await;
    assert_eq!(json["totalCount"], 3);
    assert_eq!(json["limit"], 50);
    assert_eq!(json["logs"][0]["message"], "third");
    assert_eq!(json["logs"][2]["message"], "first");

    let json = expect_json(
        get_with_auth(&app.router, "/api/logs?source=chrome-extension&limit=1", &token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["totalCount"], 2);
    assert_eq!(json["logs"].as_array().unwrap().len(), 1);
    assert_eq!(json["logs"][0]["message"], "third");

    let json = expect_json(get_with_auth(&app.router, "/api/logs?level=warning", &token).await, StatusCode::OK).await;
    assert_eq!(json["totalCount"], 1);
    assert_eq!(json["logs"][0]["source"], "api");

}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_filters_match_nothing(pool: PgPool) {
    let app = build_test_app(pool);
    record(&app.router, "api", "error", "boom").await;
    let token = token_with_role("ADMIN");

    for query in ["source=bogus", "level=loud", "source=api&level=loud"] {
        let json = expect_json(
            get_with_auth(&app.router, &format!("/api/logs?{query}"), &token).await,
            StatusCode::OK,
        )
        .await;
        assert_eq!(json["totalCount"], 0, "{query}");
        assert_eq!(json["logs"], json!([]), "{query}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_role_is_also_accepted(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get_with_auth(&app.router, "/api/logs", &token_with_role("ADMIN")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
