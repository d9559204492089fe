//! Ordered log severity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::DgmError;

/// Severity of a log record. Ordered: a record is written only when its
/// severity is at or above the logger's threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Diagnostic detail.
    #[default]
    Debug = 0,
    /// Normal progress.
    Info = 1,
    /// Recoverable problem.
    Warning = 2,
    /// Failed operation.
    Error = 3,
    /// Always written; the highest threshold.
    Production = 4,
}

impl Severity {
    /// All severities, most permissive first.
    pub const ALL: [Self; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Production,
    ];

    /// Upper-case label used in the record prefix.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Production => "PRODUCTION",
        }
    }

    /// Inverse of `severity as u8`.
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Debug),
            1 => Some(Self::Info),
            2 => Some(Self::Warning),
            3 => Some(Self::Error),
            4 => Some(Self::Production),
            _ => None,
        }
    }

    /// Whether a record at `self` passes a logger configured with `threshold`.
    #[must_use]
    pub fn passes(self, threshold: Self) -> bool {
        self >= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = DgmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "0" => Ok(Self::Debug),
            "info" | "1" => Ok(Self::Info),
            "warning" | "warn" | "2" => Ok(Self::Warning),
            "error" | "3" => Ok(Self::Error),
            "production" | "4" => Ok(Self::Production),
            other => Err(DgmError::ConfigParse {
                context: "severity",
                details: format!("unknown severity {other:?}"),
            }),
        }
    }
}
