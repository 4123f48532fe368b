//! Repository for the `screenshot_data` table.

use feedback_core::timestamps::millis_to_seconds;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dom::{decode_dom_tree, encode_dom_tree};
use crate::models::screenshot::{CreateScreenshotData, ScreenshotData, ScreenshotSummary, TempComment};

/// Column list for `screenshot_data` queries.
const COLUMNS: &str = "\
    id, screenshot_url, dom_tree, tab_url, tab_title, timestamp, \
    page_info, temp_comment, created_at, updated_at";

/// Column list without the DOM payload.
const SUMMARY_COLUMNS: &str = "\
    id, screenshot_url, tab_url, tab_title, timestamp, \
    page_info, temp_comment, created_at";

fn decoded(mut row: ScreenshotData) -> ScreenshotData {
    row.dom_tree = decode_dom_tree(&row.dom_tree);
    row
}

pub struct ScreenshotDataRepo;

impl ScreenshotDataRepo {
    /// Store a capture, returning its generated ID.
    ///
    /// The DOM is base64-encoded and the millisecond timestamp floored to
    /// seconds before writing.
    pub async fn insert(pool: &PgPool, input: &CreateScreenshotData) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO screenshot_data \
                (id, screenshot_url, dom_tree, tab_url, tab_title, timestamp, page_info) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&input.screenshot_url)
        .bind(encode_dom_tree(&input.dom_tree))
        .bind(&input.tab_url)
        .bind(&input.tab_title)
        .bind(millis_to_seconds(input.timestamp))
        .bind(&input.page_info)
        .execute(pool)
        .await?;
        Ok(id)
    }

    /// Find a capture by ID with its DOM decoded.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ScreenshotData>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM screenshot_data WHERE id = $1");
        let row = sqlx::query_as::<_, ScreenshotData>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(decoded))
    }

    /// Fetch several captures at once, DOMs decoded. Missing IDs are skipped.
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<ScreenshotData>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {COLUMNS} FROM screenshot_data WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, ScreenshotData>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(decoded).collect())
    }

    /// Capture metadata without the DOM.
    pub async fn find_summary(pool: &PgPool, id: Uuid) -> Result<Option<ScreenshotSummary>, sqlx::Error> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM screenshot_data WHERE id = $1");
        sqlx::query_as::<_, ScreenshotSummary>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM screenshot_data WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Read the draft comment. `None` when the capture does not exist.
    pub async fn find_temp_comment(pool: &PgPool, id: Uuid) -> Result<Option<TempComment>, sqlx::Error> {
        sqlx::query_as::<_, TempComment>(
            "SELECT id, temp_comment, updated_at FROM screenshot_data WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Replace the draft comment; an empty string clears it.
    ///
    /// Returns `None` when the capture does not exist.
    pub async fn update_temp_comment(
        pool: &PgPool,
        id: Uuid,
        temp_comment: &str,
    ) -> Result<Option<TempComment>, sqlx::Error> {
        let value = (!temp_comment.is_empty()).then_some(temp_comment);
        sqlx::query_as::<_, TempComment>(
            "UPDATE screenshot_data SET temp_comment = $2 WHERE id = $1 \
             RETURNING id, temp_comment, updated_at",
        )
        .bind(id)
        .bind(value)
        .fetch_optional(pool)
        .await
    }
}
