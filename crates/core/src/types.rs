/// Feedback primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All store-managed timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Capture and submission times are whole seconds since the Unix epoch.
pub type EpochSeconds = i64;

/// Millisecond timestamps as sent by the browser extension.
pub type EpochMillis = i64;
