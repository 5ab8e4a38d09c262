//! `tracing` layer feeding the in-memory buffer and the persistent file sink.
//!
//! Each event is rendered exactly once; the same line goes to the buffer and
//! to the file writer so both consumers see identical text.

use super::buffer::LogBuffer;
use super::record::{LogLevel, LogRecord};
use chrono::Utc;
use std::fmt::{self, Write as _};
use std::io::Write as _;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};

/// Layer that captures events into a [`LogBuffer`] and an optional writer.
pub struct CaptureLayer<W = NonBlocking> {
    buffer: Option<LogBuffer>,
    sink: Option<W>,
}

impl CaptureLayer {
    /// A layer with no targets; add them with [`with_buffer`](Self::with_buffer)
    /// and [`with_sink`](Self::with_sink).
    pub fn new() -> Self {
        Self {
            buffer: None,
            sink: None,
        }
    }
}

impl Default for CaptureLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> CaptureLayer<W> {
    /// Store captured records in `buffer`.
    pub fn with_buffer(mut self, buffer: LogBuffer) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Also write every rendered line to `sink`.
    pub fn with_sink<S>(self, sink: S) -> CaptureLayer<S> {
        CaptureLayer {
            buffer: self.buffer,
            sink: Some(sink),
        }
    }
}

impl<W> CaptureLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn capture(&self, event: &Event<'_>) {
        let timestamp = Utc::now();
        let meta = event.metadata();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord::new(
            timestamp,
            LogLevel::from(*meta.level()),
            meta.target(),
            visitor.finish(),
        );

        if let Some(sink) = &self.sink {
            let mut writer = sink.make_writer();
            if let Err(e) = writeln!(writer, "{}", record.message) {
                eprintln!("log sink write failed: {e}");
            }
        }

        if let Some(buffer) = &self.buffer {
            buffer.try_push(record);
        }
    }
}

impl<S, W> Layer<S> for CaptureLayer<W>
where
    S: Subscriber,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // A panicking field formatter must never reach the emitting call site.
        if catch_unwind(AssertUnwindSafe(|| self.capture(event))).is_err() {
            eprintln!(
                "log capture failed for event from '{}'",
                event.metadata().target()
            );
        }
    }
}

/// Collects the `message` field and renders the rest as ` key=value`.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: String,
}

impl FieldVisitor {
    fn finish(self) -> String {
        if self.message.is_empty() {
            self.fields.trim_start().to_owned()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else if !field.name().starts_with("log.") {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}
