//! Error reporting on top of the leveled logger.
//!
//! A report always writes the message at `error` severity, optionally
//! followed by a `Reason:` line one level deeper, an optional diagnostic
//! capture, and an optional process exit.

#![allow(missing_docs)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{DgmError, Result};
use crate::logger::leveled::{Emitted, Logger, Record, Stream};
use crate::logger::level::Severity;
use crate::text::format::now;

/// Exit status used when termination is requested without a numeric code.
pub const GENERIC_FAILURE_CODE: i32 = 1;

/// Something that can save diagnostic context (a screenshot, a page dump)
/// to a file when an error is reported.
pub trait DiagnosticCapture {
    fn capture(&self, target: &Path) -> Result<()>;
}

impl<F> DiagnosticCapture for F
where
    F: Fn(&Path) -> Result<()>,
{
    fn capture(&self, target: &Path) -> Result<()> {
        self(target)
    }
}

/// Why the process is being ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Exit with exactly this status.
    Code(i32),
    /// Exit with [`GENERIC_FAILURE_CODE`].
    Message(String),
}

impl Termination {
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Code(code) => *code,
            Self::Message(_) => GENERIC_FAILURE_CODE,
        }
    }

    /// `Code(0)` closes out processing as a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Code(0))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit status {code}"),
            Self::Message(message) => f.write_str(message),
        }
    }
}

/// An error to report.
pub struct ErrorReport<'a> {
    pub message: &'a str,
    pub cause: Option<String>,
    pub indent: usize,
    pub stream: Stream,
    pub terminate: Option<Termination>,
    pub capture: Option<&'a dyn DiagnosticCapture>,
}

impl<'a> ErrorReport<'a> {
    /// Non-terminating report on the general sink.
    #[must_use]
    pub const fn new(message: &'a str) -> Self {
        Self {
            message,
            cause: None,
            indent: 0,
            stream: Stream::General,
            terminate: None,
            capture: None,
        }
    }

    #[must_use]
    pub fn cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    #[must_use]
    pub const fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Report to the database sink.
    #[must_use]
    pub const fn database(mut self) -> Self {
        self.stream = Stream::Database;
        self
    }

    /// End the process with the generic failure code after reporting.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.terminate = Some(Termination::Message(self.message.to_string()));
        self
    }

    /// End the process with `code` after reporting.
    #[must_use]
    pub fn finish_with_code(mut self, code: i32) -> Self {
        self.terminate = Some(Termination::Code(code));
        self
    }

    #[must_use]
    pub fn capture(mut self, capture: &'a dyn DiagnosticCapture) -> Self {
        self.capture = Some(capture);
        self
    }
}

/// What a non-terminating report did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOutcome {
    pub lines_written: usize,
    /// File produced by the diagnostic capture, when it succeeded.
    pub capture_path: Option<PathBuf>,
}

impl Logger {
    /// Log an error report. Returns unless a failing termination was
    /// requested.
    pub fn report(&self, report: &ErrorReport<'_>) -> ReportOutcome {
        let mut outcome = ReportOutcome::default();

        let record = Record::new(Severity::Error, report.message).indent(report.indent);
        if self.emit(report.stream, &record) == Emitted::Written {
            outcome.lines_written += 1;
        }

        if let Some(cause) = &report.cause {
            let text = format!("Reason: {cause}");
            let record = Record::new(Severity::Error, &text).indent(report.indent + 1);
            if self.emit(report.stream, &record) == Emitted::Written {
                outcome.lines_written += 1;
            }
        }

        if let Some(capture) = report.capture {
            outcome.capture_path = self.run_capture(capture, report.indent);
        }

        if report.terminate.is_some() {
            self.finish_processing(report.terminate.as_ref());
        }

        outcome
    }

    /// Non-terminating error with an optional cause.
    pub fn error(&self, message: &str, cause: Option<&dyn fmt::Display>, indent: usize) {
        let mut report = ErrorReport::new(message).indent(indent);
        if let Some(cause) = cause {
            report = report.cause(cause);
        }
        self.report(&report);
    }

    /// Close out processing. `None` and `Code(0)` log success and return;
    /// any other termination is logged and ends the process.
    pub fn finish_processing(&self, status: Option<&Termination>) {
        match status {
            Some(termination) if !termination.is_success() => self.terminate(termination),
            _ => {
                self.log(Severity::Info, 0, "Process terminated successfully");
            }
        }
    }

    /// Log `Error processing.` with the reason and exit.
    pub fn terminate(&self, termination: &Termination) -> ! {
        self.log(Severity::Error, 0, "Error processing.");
        self.log(Severity::Error, 1, &format!("Reason: {termination}"));
        std::process::exit(termination.exit_code())
    }

    /// Target file for a diagnostic capture taken now.
    #[must_use]
    pub fn capture_target(&self) -> PathBuf {
        self.paths().screenshot_dir.join(format!(
            "ERROR - {}_{}.png",
            self.paths().program_name,
            now("%Y%m%d_%H%M%S")
        ))
    }

    fn run_capture(&self, capture: &dyn DiagnosticCapture, indent: usize) -> Option<PathBuf> {
        let target = self.capture_target();
        let result = target
            .parent()
            .map_or(Ok(()), |dir| {
                fs::create_dir_all(dir).map_err(|source| DgmError::io(dir, source))
            })
            .and_then(|()| capture.capture(&target));

        match result {
            Ok(()) => Some(target),
            Err(e) => {
                self.log(
                    Severity::Warning,
                    indent + 1,
                    &format!("diagnostic capture failed: {e}"),
                );
                None
            }
        }
    }
}
