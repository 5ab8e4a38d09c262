//! Persistent log file sink.
//!
//! Rotation and retention are delegated to `tracing-appender`; this module
//! only opens the appender and reads back the tail of its current file.

use crate::config::{LogRotation, LoggingConfig};
use crate::error::{Result, WatchError};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Default number of lines returned by [`tail_log_file`].
pub const DEFAULT_TAIL_LINES: usize = 500;

/// Upper bound on lines returned by [`tail_log_file`].
pub const MAX_TAIL_LINES: usize = 5000;

/// Where the persistent sink writes its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileLocation {
    /// Directory holding the current and rolled files.
    pub dir: PathBuf,
    /// File name prefix shared by every file of the sink.
    pub prefix: String,
    /// File name suffix shared by every file of the sink.
    pub suffix: String,
}

impl LogFileLocation {
    /// The most recently modified file belonging to this sink, if any.
    pub fn current_file(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.dir).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with(&self.prefix) && name.ends_with(&self.suffix)
            })
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, entry.path()))
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path)
    }
}

/// An opened file sink: writer handle, flush guard and location.
pub struct FileSink {
    /// Non-blocking writer handed to the capture layer.
    pub writer: NonBlocking,
    /// Flushes buffered lines on drop; keep alive for the process lifetime.
    pub guard: WorkerGuard,
    /// Where the files live.
    pub location: LogFileLocation,
}

/// Open the rolling file sink described by `config`.
///
/// Returns `Ok(None)` when no log directory is configured.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the appender
/// cannot be initialised.
pub fn open_file_sink(config: &LoggingConfig) -> Result<Option<FileSink>> {
    let Some(dir) = config.log_dir.clone() else {
        return Ok(None);
    };
    std::fs::create_dir_all(&dir)?;

    let rotation = match config.rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.file_prefix)
        .filename_suffix(&config.file_suffix)
        .max_log_files(config.max_files.max(1))
        .build(&dir)
        .map_err(|e| WatchError::Logging(format!("cannot open log file in {}: {e}", dir.display())))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);

    Ok(Some(FileSink {
        writer,
        guard,
        location: LogFileLocation {
            dir,
            prefix: config.file_prefix.clone(),
            suffix: config.file_suffix.clone(),
        },
    }))
}

/// Read the last `lines` lines (capped at [`MAX_TAIL_LINES`]) of the sink's
/// current file.
///
/// # Errors
///
/// Returns [`WatchError::LogFileNotFound`] when the sink has not written a
/// file yet, or an I/O error if the file cannot be read.
pub fn tail_log_file(location: &LogFileLocation, lines: usize) -> Result<Vec<String>> {
    let path = location.current_file().ok_or(WatchError::LogFileNotFound)?;
    tail_file(&path, lines)
}

/// Bytes read per backwards step when tailing.
const TAIL_CHUNK: u64 = 8 * 1024;

/// Read backwards from the end of `path` until `lines` complete lines are in
/// hand, so memory is bounded by the tail size rather than the file size.
fn tail_file(path: &Path, lines: usize) -> Result<Vec<String>> {
    let lines = lines.min(MAX_TAIL_LINES);
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatchError::LogFileNotFound);
        }
        Err(e) => return Err(e.into()),
    };

    let mut pos = file.metadata()?.len();
    let mut tail: Vec<u8> = Vec::new();
    let mut newlines = 0usize;
    // One newline more than `lines` guarantees the first kept line is whole.
    while pos > 0 && newlines <= lines {
        let step = TAIL_CHUNK.min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;
        let mut chunk = vec![0u8; usize::try_from(step).unwrap_or(usize::MAX)];
        file.read_exact(&mut chunk)?;
        newlines += chunk.iter().filter(|&&b| b == b'\n').count();
        chunk.extend_from_slice(&tail);
        tail = chunk;
    }

    let text = String::from_utf8_lossy(&tail);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].iter().map(|l| (*l).to_owned()).collect())
}
