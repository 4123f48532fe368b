//! Integration tests for `ScreenshotDataRepo`.

use feedback_db::models::screenshot::CreateScreenshotData;
use feedback_db::repositories::ScreenshotDataRepo;
use sqlx::PgPool;
use uuid::Uuid;

fn capture(dom: &str) -> CreateScreenshotData {
    CreateScreenshotData {
        screenshot_url: "https://bucket.example/screenshots/1.png".to_string(),
        dom_tree: dom.to_string(),
        tab_url: "https://app.example/page".to_string(),
        tab_title: "Page".to_string(),
        timestamp: 1_734_944_285_999,
        page_info: Some(serde_json::json!({ "url": "https://app.example/page" })),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn insert_encodes_dom_and_floors_timestamp(pool: PgPool) {
    let dom = "<div>\u{1}control</div>";
    let id = ScreenshotDataRepo::insert(&pool, &capture(dom)).await.unwrap();

    let (stored,): (String,) = sqlx::query_as("SELECT dom_tree FROM screenshot_data WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(stored, dom);

    let found = ScreenshotDataRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(found.dom_tree, dom);
    assert_eq!(found.timestamp, 1_734_944_285);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn raw_legacy_dom_is_returned_unchanged(pool: PgPool) {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO screenshot_data (id, screenshot_url, dom_tree, tab_url, tab_title, timestamp) \
         VALUES ($1, 'u', '<p>raw</p>', 't', '', 0)",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();

    let found = ScreenshotDataRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(found.dom_tree, "<p>raw</p>");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn temp_comment_round_trip(pool: PgPool) {
    let id = ScreenshotDataRepo::insert(&pool, &capture("<p/>")).await.unwrap();

    let initial = ScreenshotDataRepo::find_temp_comment(&pool, id).await.unwrap().unwrap();
    assert_eq!(initial.temp_comment, None);

    let updated = ScreenshotDataRepo::update_temp_comment(&pool, id, "draft")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.temp_comment.as_deref(), Some("draft"));

    let cleared = ScreenshotDataRepo::update_temp_comment(&pool, id, "")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.temp_comment, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_capture_reads_as_none(pool: PgPool) {
    let id = Uuid::now_v7();
    assert!(ScreenshotDataRepo::find_by_id(&pool, id).await.unwrap().is_none());
    assert!(ScreenshotDataRepo::find_summary(&pool, id).await.unwrap().is_none());
    assert!(!ScreenshotDataRepo::exists(&pool, id).await.unwrap());
    assert!(ScreenshotDataRepo::update_temp_comment(&pool, id, "x")
        .await
        .unwrap()
        .is_none());
}
