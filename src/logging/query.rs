//! Paginated read access to captured logs.

use super::buffer::LogBuffer;
use super::record::{LogLevel, LogRecord};
use super::sink::{DEFAULT_TAIL_LINES, LogFileLocation, tail_log_file};
use crate::error::{Result, WatchError};
use serde::Serialize;

/// Default page size for [`LogQuery`].
pub const DEFAULT_LIMIT: usize = 100;

/// Upper bound on the page size.
pub const MAX_LIMIT: usize = 1000;

/// Filter and pagination for a buffer read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Exact level match.
    pub level: Option<LogLevel>,
    /// Exact logger-name match.
    pub logger: Option<String>,
    /// Page size, already capped at [`MAX_LIMIT`].
    pub limit: usize,
    /// Matches skipped before the page starts.
    pub offset: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            level: None,
            logger: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl LogQuery {
    /// Build a query from loosely-typed request parameters.
    ///
    /// Empty strings count as "no filter"; `limit` is capped at
    /// [`MAX_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidQuery`] for an unknown level name.
    pub fn from_params(
        level: Option<&str>,
        logger: Option<&str>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Self> {
        let level = match level.map(str::trim).filter(|l| !l.is_empty()) {
            Some(raw) => Some(raw.parse::<LogLevel>()?),
            None => None,
        };
        let logger = logger
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned);
        Ok(Self {
            level,
            logger,
            limit: limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: offset.unwrap_or(0),
        })
    }
}

/// One page of matching records.
#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    /// Records in the page, oldest first.
    pub logs: Vec<LogRecord>,
    /// Matches before pagination.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Read-side facade over the buffer and the file sink.
///
/// Either side may be absent: capture can be disabled in config and the file
/// sink only exists when a log directory is configured. Calls against a
/// missing buffer fail with [`WatchError::LogBufferNotInitialized`] rather
/// than returning an empty result.
#[derive(Debug, Clone, Default)]
pub struct LogService {
    buffer: Option<LogBuffer>,
    file: Option<LogFileLocation>,
}

impl LogService {
    pub fn new(buffer: Option<LogBuffer>, file: Option<LogFileLocation>) -> Self {
        Self { buffer, file }
    }

    fn buffer(&self) -> Result<&LogBuffer> {
        self.buffer.as_ref().ok_or(WatchError::LogBufferNotInitialized)
    }

    /// Matching records for `query`, paginated.
    pub fn recent(&self, query: &LogQuery) -> Result<LogPage> {
        let matches = self
            .buffer()?
            .query(query.level, query.logger.as_deref(), None);
        let total = matches.len();
        let logs = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        Ok(LogPage {
            logs,
            total,
            offset: query.offset,
            limit: query.limit,
        })
    }

    /// Distinct logger names in the buffer, sorted.
    pub fn logger_names(&self) -> Result<Vec<String>> {
        Ok(self.buffer()?.logger_names())
    }

    /// Drop every buffered record.
    pub fn clear(&self) -> Result<()> {
        self.buffer()?.clear();
        Ok(())
    }

    /// Last `lines` lines of the persistent file (default 500, max 5000).
    ///
    /// # Errors
    ///
    /// [`WatchError::LogFileNotFound`] when no file sink is configured or it
    /// has not written anything yet.
    pub fn tail_file(&self, lines: Option<usize>) -> Result<Vec<String>> {
        let location = self.file.as_ref().ok_or(WatchError::LogFileNotFound)?;
        tail_log_file(location, lines.unwrap_or(DEFAULT_TAIL_LINES))
    }
}
