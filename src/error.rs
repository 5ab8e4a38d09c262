//! Error types for the signal-watch service.

/// Top-level error type for the scheduler, log capture and HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Configuration error (parse, serialize, or collaborator lookup).
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scheduler error (runtime missing, background task setup).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Logging pipeline setup error.
    #[error("logging error: {0}")]
    Logging(String),

    /// The in-memory log buffer was queried before it was installed.
    #[error("log handler not initialized")]
    LogBufferNotInitialized,

    /// The persistent log file does not exist yet.
    #[error("log file not found")]
    LogFileNotFound,

    /// A query parameter could not be interpreted.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// HTTP server error (bind, serve).
    #[error("server error: {0}")]
    Server(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WatchError>;
