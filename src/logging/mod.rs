//! Log capture and the process-wide `tracing` setup.
//!
//! Events flow through a single subscriber: an [`EnvFilter`], a stderr `fmt`
//! layer and the [`CaptureLayer`], which renders each event once and hands the
//! line to both the in-memory [`LogBuffer`] and the rolling file sink.

pub mod buffer;
pub mod layer;
pub mod query;
pub mod record;
pub mod sink;

pub use buffer::LogBuffer;
pub use layer::CaptureLayer;
pub use query::{LogPage, LogQuery, LogService};
pub use record::{LogLevel, LogRecord};
pub use sink::{LogFileLocation, tail_log_file};

use crate::config::LoggingConfig;
use crate::error::{Result, WatchError};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

/// Handles produced by logging setup.
///
/// Must be kept alive for the lifetime of the process: dropping it flushes
/// and stops the file writer.
pub struct LoggingHandle {
    buffer: Option<LogBuffer>,
    file: Option<LogFileLocation>,
    _guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    /// The capture buffer, when capture is enabled.
    pub fn buffer(&self) -> Option<&LogBuffer> {
        self.buffer.as_ref()
    }

    /// Location of the persistent log files, when a log directory is set.
    pub fn file(&self) -> Option<&LogFileLocation> {
        self.file.as_ref()
    }

    /// Read-side facade for the HTTP surface.
    pub fn service(&self) -> LogService {
        LogService::new(self.buffer.clone(), self.file.clone())
    }
}

/// Build the subscriber described by `config` without installing it.
///
/// # Errors
///
/// Returns an error if the file sink cannot be opened.
pub fn build(
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, LoggingHandle)> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| WatchError::Logging(format!("invalid log filter '{}': {e}", config.level)))?;

    let buffer = config
        .capture
        .then(|| LogBuffer::new(config.buffer_capacity));

    let (writer, guard, file) = match sink::open_file_sink(config)? {
        Some(sink) => (Some(sink.writer), Some(sink.guard), Some(sink.location)),
        None => (None, None, None),
    };

    let mut capture = CaptureLayer::new();
    if let Some(buffer) = &buffer {
        capture = capture.with_buffer(buffer.clone());
    }
    if let Some(writer) = writer {
        capture = capture.with_sink(writer);
    }

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(capture);

    Ok((
        subscriber,
        LoggingHandle {
            buffer,
            file,
            _guard: guard,
        },
    ))
}

/// Build the subscriber and install it as the global default.
///
/// # Errors
///
/// Returns an error if the file sink cannot be opened or a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingHandle> {
    let (subscriber, handle) = build(config)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| WatchError::Logging(format!("cannot install subscriber: {e}")))?;
    tracing::info!(
        capture = handle.buffer.is_some(),
        file = handle.file.is_some(),
        "logging initialised"
    );
    Ok(handle)
}
