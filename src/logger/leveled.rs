//! Leveled logger writing to a general sink and a database sink.
//!
//! One [`Logger`] is built at startup and passed by reference to every call
//! site. It owns the severity threshold and both sinks; there is no global
//! logging state.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use crate::core::config::LoggingConfig;
use crate::core::errors::Result;
use crate::core::paths::LogPaths;
use crate::logger::level::Severity;
use crate::logger::sink::{Sink, WriteMode};
use crate::text::format::{TIMESTAMP_FORMAT, indent_text, now};

/// Which sink a record goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stream {
    /// Day-to-day process log.
    #[default]
    General,
    /// Log of database activity.
    Database,
}

/// A single log call. Built per call, serialized immediately, never kept.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Message body.
    pub text: &'a str,
    /// Indent levels, four spaces each.
    pub indent: usize,
    /// Gated against the logger's threshold.
    pub severity: Severity,
    /// Overwrite the sink (with a title banner) before writing.
    pub truncate: bool,
    /// Spacing line: written as a bare newline without prefix.
    pub continuation: bool,
}

impl<'a> Record<'a> {
    /// Plain record at indent zero.
    #[must_use]
    pub const fn new(severity: Severity, text: &'a str) -> Self {
        Self {
            text,
            indent: 0,
            severity,
            truncate: false,
            continuation: false,
        }
    }

    /// Empty spacing line.
    #[must_use]
    pub const fn blank(severity: Severity) -> Self {
        Self {
            text: "",
            indent: 0,
            severity,
            truncate: false,
            continuation: true,
        }
    }

    /// Set the indent level.
    #[must_use]
    pub const fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Overwrite the sink before writing.
    #[must_use]
    pub const fn truncate(mut self) -> Self {
        self.truncate = true;
        self
    }
}

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitted {
    /// Reached the sink.
    Written,
    /// Below the configured threshold, or the sink could not be written.
    Suppressed,
}

/// Leveled logger with two independent sinks sharing one format.
#[derive(Debug)]
pub struct Logger {
    threshold: AtomicU8,
    paths: LogPaths,
    general: Sink,
    database: Sink,
    mirror_stdout: bool,
}

impl Logger {
    /// Logger over an explicit layout.
    #[must_use]
    pub fn new(paths: LogPaths, threshold: Severity) -> Self {
        Self {
            threshold: AtomicU8::new(threshold as u8),
            general: Sink::new(paths.general_log.clone()),
            database: Sink::new(paths.database_log.clone()),
            paths,
            mirror_stdout: true,
        }
    }

    /// Logger for the running process, laid out per `config`.
    #[must_use]
    pub fn from_config(config: &LoggingConfig) -> Self {
        let paths = LogPaths::for_current_process(
            config.base_dir.as_deref(),
            config.program_name.as_deref(),
        );
        Self::new(paths, config.level).with_stdout_mirror(config.mirror_stdout)
    }

    /// Enable or disable echoing records on stdout.
    #[must_use]
    pub fn with_stdout_mirror(mut self, enabled: bool) -> Self {
        self.mirror_stdout = enabled;
        self
    }

    /// Current threshold.
    #[must_use]
    pub fn level(&self) -> Severity {
        Severity::from_ordinal(self.threshold.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Change the threshold for subsequent calls.
    pub fn set_level(&self, level: Severity) {
        self.threshold.store(level as u8, Ordering::Relaxed);
    }

    /// Resolved file layout.
    #[must_use]
    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    /// Sink behind `stream`.
    #[must_use]
    pub fn sink(&self, stream: Stream) -> &Sink {
        match stream {
            Stream::General => &self.general,
            Stream::Database => &self.database,
        }
    }

    /// Format and write `record`, surfacing sink failures. The stdout
    /// mirror sees the record even when the sink write fails.
    pub fn try_emit(&self, stream: Stream, record: &Record<'_>) -> Result<Emitted> {
        if !record.severity.passes(self.level()) {
            return Ok(Emitted::Suppressed);
        }
        let line = format_record(record);
        self.deliver(stream, record, &line)?;
        Ok(Emitted::Written)
    }

    /// [`Logger::try_emit`] that reports sink failures on stderr instead of
    /// returning them. Logging never aborts the caller.
    pub fn emit(&self, stream: Stream, record: &Record<'_>) -> Emitted {
        self.emit_or_fallback(stream, record, &mut io::stderr().lock())
    }

    /// On a sink failure the formatted record goes to `fallback` along with
    /// the error, so its text is never lost.
    fn emit_or_fallback(
        &self,
        stream: Stream,
        record: &Record<'_>,
        fallback: &mut dyn Write,
    ) -> Emitted {
        if !record.severity.passes(self.level()) {
            return Emitted::Suppressed;
        }
        let line = format_record(record);
        match self.deliver(stream, record, &line) {
            Ok(()) => Emitted::Written,
            Err(e) => {
                let _ = writeln!(fallback, "[DGM-LOG] {e}: {line}");
                Emitted::Suppressed
            }
        }
    }

    fn deliver(&self, stream: Stream, record: &Record<'_>, line: &str) -> Result<()> {
        if self.mirror_stdout {
            mirror(line);
        }
        let mode = if record.truncate && !record.continuation {
            WriteMode::Truncate
        } else {
            WriteMode::Append
        };
        let sink = self.sink(stream);
        sink.ensure_dir()?;
        sink.write_line(line, mode)
    }

    /// Write `text` to the general sink.
    pub fn log(&self, severity: Severity, indent: usize, text: &str) -> Emitted {
        self.emit(Stream::General, &Record::new(severity, text).indent(indent))
    }

    /// Write `text` to the database sink.
    pub fn database_log(&self, severity: Severity, indent: usize, text: &str) -> Emitted {
        self.emit(Stream::Database, &Record::new(severity, text).indent(indent))
    }

    /// Spacing line on the general sink.
    pub fn log_empty_line(&self, severity: Severity) -> Emitted {
        self.emit(Stream::General, &Record::blank(severity))
    }

    /// Spacing line on the database sink.
    pub fn database_log_empty_line(&self, severity: Severity) -> Emitted {
        self.emit(Stream::Database, &Record::blank(severity))
    }
}

/// `<timestamp> - [<LEVEL>]: <indent><text>`, or an empty string for
/// continuation records.
#[must_use]
pub fn format_record(record: &Record<'_>) -> String {
    if record.continuation {
        return String::new();
    }
    format!(
        "{} - [{}]: {}",
        now(TIMESTAMP_FORMAT),
        record.severity.label(),
        indent_text(record.text, record.indent)
    )
}

/// Best-effort echo on stdout. A closed or broken stdout is ignored.
fn mirror(line: &str) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{line}");
}
