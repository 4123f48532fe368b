pub mod health;

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{feedback, logs, screenshot, uploads};
use crate::state::AppState;

/// Routes called by the browser extension. Served with permissive CORS.
///
/// ```text
/// POST   /feedback                           submit feedback
/// POST   /feedback/upload-screenshot-dom     store screenshot + DOM
/// POST   /feedback/{id}/create-task          manual task creation
/// GET    /screenshot/{id}                    capture metadata
/// GET    /screenshot/{id}/temp-comment       read draft comment
/// POST   /screenshot/{id}/temp-comment       save draft comment
/// PUT    /uploads/local                      local-disk upload target
/// POST   /s3/presigned-url                   upload URL
/// GET    /logs                               list error logs (power user)
/// POST   /logs                               record error log
/// ```
pub fn ingestion_routes() -> Router<AppState> {
    Router::new()
        .route("/feedback", post(feedback::submit_feedback))
        .route(
            "/feedback/upload-screenshot-dom",
            post(feedback::upload_screenshot_dom),
        )
        .route("/feedback/{id}/create-task", post(feedback::create_task))
        .route("/screenshot/{id}", get(screenshot::get_screenshot))
        .route(
            "/screenshot/{id}/temp-comment",
            get(screenshot::get_temp_comment).post(screenshot::save_temp_comment),
        )
        .route("/uploads/local", put(uploads::upload_local))
        .route("/s3/presigned-url", post(uploads::presigned_url))
        .route("/logs", get(logs::list_logs).post(logs::create_log))
}

/// Routes used by the admin viewer. Served with the configured origins.
///
/// ```text
/// GET    /feedback/list        page of feedback + stats
/// GET    /feedback/{id}        feedback with decoded capture
/// PATCH  /feedback/{id}        edit comment
/// DELETE /feedback/{id}        delete
/// ```
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/feedback/list", get(feedback::list_feedback))
        .route(
            "/feedback/{id}",
            get(feedback::get_feedback)
                .patch(feedback::update_feedback)
                .delete(feedback::delete_feedback),
        )
}
