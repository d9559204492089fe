//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dgm_utils::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DgmError, Result};
pub use crate::core::paths::LogPaths;

// Logger
pub use crate::logger::level::Severity;
pub use crate::logger::leveled::{Logger, Record, Stream};
pub use crate::logger::reporter::{DiagnosticCapture, ErrorReport, Termination};

// Text
pub use crate::text::balance::normalize_delimiters;
pub use crate::text::format::{indent_text, space_text};

// Platform
pub use crate::platform::command::run_command;
pub use crate::platform::env::{get_env, set_env};

// Net
pub use crate::net::fetch::{FetchOutcome, FetchRequest, HttpFetcher};
pub use crate::net::url::normalize_url;

// Formats
pub use crate::formats::ini::{IniFile, get_ini_value};

// Mail
pub use crate::mail::{MailMessage, MailTransport, SmtpMailTransport, send_email};

// Imaging
pub use crate::imaging::stats::ImageSource;
