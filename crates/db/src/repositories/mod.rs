//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an executor, where the call must join a caller's
//! transaction) as the first argument.

pub mod feedback_repo;
pub mod notification_job_repo;
pub mod screenshot_data_repo;

pub use feedback_repo::FeedbackRepo;
pub use notification_job_repo::NotificationJobRepo;
pub use screenshot_data_repo::ScreenshotDataRepo;
