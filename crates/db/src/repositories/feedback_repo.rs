//! Repository for the `feedback` table.

use std::collections::HashMap;

use feedback_core::pagination::{offset_for, total_pages};
use feedback_core::timestamps::millis_to_seconds;
use feedback_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::feedback::{
    CreateFeedback, Feedback, FeedbackPage, FeedbackStats, FeedbackWithScreenshot,
};
use crate::repositories::ScreenshotDataRepo;

/// Column list for `feedback` queries.
const COLUMNS: &str = "\
    id, comment, screenshot_data_id, timestamp, user_agent, url, user_name, \
    created_at, updated_at";

pub struct FeedbackRepo;

impl FeedbackRepo {
    /// Insert a feedback row, returning it.
    ///
    /// Takes any executor so ingestion can run it inside the transaction
    /// that also enqueues the notification job.
    pub async fn insert<'e, E>(executor: E, input: &CreateFeedback) -> Result<Feedback, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO feedback \
                (comment, screenshot_data_id, timestamp, user_agent, url, user_name) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(&input.comment)
            .bind(input.screenshot_data_id)
            .bind(millis_to_seconds(input.timestamp))
            .bind(&input.user_agent)
            .bind(&input.url)
            .bind(&input.user_name)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM feedback WHERE id = $1");
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Feedback with its screenshot capture joined and decoded.
    ///
    /// A dangling `screenshot_data_id` yields `screenshot_data: None`.
    pub async fn find_by_id_with_screenshot(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<FeedbackWithScreenshot>, sqlx::Error> {
        let Some(feedback) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let screenshot_data = match feedback.screenshot_data_id {
            Some(sid) => ScreenshotDataRepo::find_by_id(pool, sid).await?,
            None => None,
        };
        Ok(Some(FeedbackWithScreenshot {
            feedback,
            screenshot_data,
        }))
    }

    /// One page of feedback ordered by creation time, newest first.
    ///
    /// `page` and `limit` must already be clamped by the caller.
    pub async fn list_paginated(
        pool: &PgPool,
        page: i64,
        limit: i64,
    ) -> Result<FeedbackPage, sqlx::Error> {
        let total = Self::count(pool).await?;

        let query = format!(
            "SELECT {COLUMNS} FROM feedback \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, Feedback>(&query)
            .bind(limit)
            .bind(offset_for(page, limit))
            .fetch_all(pool)
            .await?;

        let screenshot_ids: Vec<_> = rows.iter().filter_map(|f| f.screenshot_data_id).collect();
        let screenshots: HashMap<_, _> = ScreenshotDataRepo::find_many(pool, &screenshot_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let feedbacks = rows
            .into_iter()
            .map(|feedback| {
                let screenshot_data = feedback
                    .screenshot_data_id
                    .and_then(|sid| screenshots.get(&sid).cloned());
                FeedbackWithScreenshot {
                    feedback,
                    screenshot_data,
                }
            })
            .collect();

        Ok(FeedbackPage {
            feedbacks,
            total,
            page,
            limit,
            total_pages: total_pages(total, limit),
        })
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feedback")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// All-time, since `today_start`, and since `week_start` counts.
    pub async fn stats(
        pool: &PgPool,
        today_start: Timestamp,
        week_start: Timestamp,
    ) -> Result<FeedbackStats, sqlx::Error> {
        sqlx::query_as::<_, FeedbackStats>(
            "SELECT \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE created_at >= $1) AS today, \
                COUNT(*) FILTER (WHERE created_at >= $2) AS this_week \
             FROM feedback",
        )
        .bind(today_start)
        .bind(week_start)
        .fetch_one(pool)
        .await
    }

    /// Replace the comment. Returns `false` if the row does not exist.
    pub async fn update_comment(pool: &PgPool, id: DbId, comment: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE feedback SET comment = $2 WHERE id = $1")
            .bind(id)
            .bind(comment)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a feedback row. The referenced capture is left in place.
    ///
    /// Returns `false` if the row does not exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
