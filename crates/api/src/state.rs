use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use feedback_core::error_log::ErrorLogBuffer;
use feedback_pipeline::NotificationPipeline;
use feedback_storage::ObjectStore;
use tokio::sync::Notify;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything shared sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: feedback_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Recent client-reported errors. Not persisted.
    pub error_logs: Arc<Mutex<ErrorLogBuffer>>,
    /// Used directly by the manual task endpoint; queued work goes through
    /// the outbox worker.
    pub pipeline: NotificationPipeline,
    pub store: Arc<ObjectStore>,
    /// Signalled after each enqueue so the worker does not wait for its
    /// next poll.
    pub worker_wake: Arc<Notify>,
}

impl AppState {
    /// Lock the error log. Poisoning is ignored.
    pub fn error_logs(&self) -> MutexGuard<'_, ErrorLogBuffer> {
        self.error_logs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
