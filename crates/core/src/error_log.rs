//! Bounded in-memory buffer of client-reported error logs.
//!
//! Entries are kept newest-first. The buffer is not persisted and is owned
//! by whoever constructs it; the API server keeps one behind a mutex in its
//! shared state.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EpochMillis;

/// Default number of entries retained.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default number of entries returned by a query.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Component that reported the log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSource {
    ChromeExtension,
    S3Upload,
    Api,
    Unknown,
}

impl LogSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChromeExtension => "chrome-extension",
            Self::S3Upload => "s3-upload",
            Self::Api => "api",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for LogSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chrome-extension" => Ok(Self::ChromeExtension),
            "s3-upload" => Ok(Self::S3Upload),
            "api" => Ok(Self::Api),
            "unknown" => Ok(Self::Unknown),
            other => Err(CoreError::Validation(format!("Unknown log source: {other}"))),
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(CoreError::Validation(format!("Unknown log level: {other}"))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when a full buffer receives a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Discard the oldest entry to make room.
    #[default]
    DropOldest,
    /// Refuse the new entry.
    RejectNew,
}

/// A stored log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub id: String,
    pub source: LogSource,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub timestamp: EpochMillis,
}

/// Input for [`ErrorLogBuffer::push`].
#[derive(Debug, Clone)]
pub struct NewErrorLog {
    pub source: LogSource,
    pub level: LogLevel,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
}

/// Query parameters for [`ErrorLogBuffer::query`].
#[derive(Debug, Clone)]
pub struct ErrorLogFilter {
    pub source: Option<LogSource>,
    pub level: Option<LogLevel>,
    pub limit: usize,
}

impl Default for ErrorLogFilter {
    fn default() -> Self {
        Self {
            source: None,
            level: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Result of a query: the first `limit` matches and the total match count.
#[derive(Debug, Clone)]
pub struct ErrorLogPage {
    pub logs: Vec<ErrorLogEntry>,
    pub total_count: usize,
}

#[derive(Debug)]
pub struct ErrorLogBuffer {
    entries: VecDeque<ErrorLogEntry>,
    capacity: usize,
    policy: EvictionPolicy,
    next_id: u64,
}

impl Default for ErrorLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, EvictionPolicy::DropOldest)
    }
}

impl ErrorLogBuffer {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            policy,
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record an entry stamped with `now`, returning its `log_{n}` id.
    ///
    /// Ids are never reused, including ids of rejected entries.
    pub fn push(&mut self, log: NewErrorLog, now: EpochMillis) -> Result<String, CoreError> {
        let id = format!("log_{}", self.next_id);
        self.next_id += 1;

        if self.entries.len() >= self.capacity {
            match self.policy {
                EvictionPolicy::DropOldest => {
                    self.entries.truncate(self.capacity - 1);
                }
                EvictionPolicy::RejectNew => {
                    return Err(CoreError::ServiceUnavailable("Error log buffer is full".into()));
                }
            }
        }

        self.entries.push_front(ErrorLogEntry {
            id: id.clone(),
            source: log.source,
            level: log.level,
            message: log.message,
            details: log.details,
            url: log.url,
            user_agent: log.user_agent,
            timestamp: now,
        });
        Ok(id)
    }

    /// Newest-first entries matching the filter.
    pub fn query(&self, filter: &ErrorLogFilter) -> ErrorLogPage {
        let matching: Vec<&ErrorLogEntry> = self
            .entries
            .iter()
            .filter(|e| filter.source.map_or(true, |s| s == e.source))
            .filter(|e| filter.level.map_or(true, |l| l == e.level))
            .collect();

        ErrorLogPage {
            total_count: matching.len(),
            logs: matching.into_iter().take(filter.limit).cloned().collect(),
        }
    }
}
