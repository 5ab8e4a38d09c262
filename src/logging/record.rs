//! Captured log record and severity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a captured record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Upper-case display name (`WARNING`, not `WARN`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = crate::WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            other => Err(crate::WatchError::InvalidQuery(format!(
                "unknown log level '{other}'"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One captured diagnostic event.
///
/// Records are built once by the capture layer and never mutated after
/// they enter the buffer; readers always receive clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the event was observed.
    pub timestamp: DateTime<Utc>,
    /// Event severity.
    pub level: LogLevel,
    /// Origin of the event (the `tracing` target).
    pub logger: String,
    /// Fully rendered line, identical to what the file sink receives.
    pub message: String,
    /// Message text and structured fields, without the line prefix.
    pub raw: String,
}

impl LogRecord {
    /// Build a record, rendering the formatted line from its parts.
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        logger: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        let logger = logger.into();
        let raw = raw.into();
        let message = format_line(&timestamp, level, &logger, &raw);
        Self {
            timestamp,
            level,
            logger,
            message,
            raw,
        }
    }
}

/// Render `"<asctime> - <logger> - <LEVEL> - <raw>"`.
pub fn format_line(timestamp: &DateTime<Utc>, level: LogLevel, logger: &str, raw: &str) -> String {
    format!(
        "{} - {logger} - {level} - {raw}",
        timestamp.format("%Y-%m-%d %H:%M:%S,%3f")
    )
}
