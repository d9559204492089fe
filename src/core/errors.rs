//! DGM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DgmError>;

/// Top-level error type for the utility toolkit.
#[derive(Debug, Error)]
pub enum DgmError {
    #[error("[DGM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DGM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DGM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DGM-1101] environment variable not found: {name}")]
    MissingEnvVar { name: String },

    #[error("[DGM-2001] INI parse failure in {path} at line {line}: {details}")]
    IniParse {
        path: PathBuf,
        line: usize,
        details: String,
    },

    #[error("[DGM-2002] unsupported text encoding: {encoding}")]
    UnsupportedEncoding { encoding: String },

    #[error("[DGM-2003] content of {path} is not valid {encoding}")]
    Decode { path: PathBuf, encoding: String },

    #[error("[DGM-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DGM-2201] image failure: {details}")]
    Image { details: String },

    #[error("[DGM-2301] invalid URL: {url:?}")]
    InvalidUrl { url: String },

    #[error("[DGM-2302] HTTP client failure: {details}")]
    Http { details: String },

    #[error("[DGM-3001] mail failure in {context}: {details}")]
    Mail {
        context: &'static str,
        details: String,
    },

    #[error("[DGM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DGM-3003] diagnostic capture failed: {details}")]
    Capture { details: String },

    #[error("[DGM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DgmError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DGM-1001",
            Self::MissingConfig { .. } => "DGM-1002",
            Self::ConfigParse { .. } => "DGM-1003",
            Self::MissingEnvVar { .. } => "DGM-1101",
            Self::IniParse { .. } => "DGM-2001",
            Self::UnsupportedEncoding { .. } => "DGM-2002",
            Self::Decode { .. } => "DGM-2003",
            Self::Serialization { .. } => "DGM-2101",
            Self::Image { .. } => "DGM-2201",
            Self::InvalidUrl { .. } => "DGM-2301",
            Self::Http { .. } => "DGM-2302",
            Self::Mail { .. } => "DGM-3001",
            Self::Io { .. } => "DGM-3002",
            Self::Capture { .. } => "DGM-3003",
            Self::Runtime { .. } => "DGM-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DgmError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DgmError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<image::ImageError> for DgmError {
    fn from(value: image::ImageError) -> Self {
        Self::Image {
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for DgmError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http {
            details: value.to_string(),
        }
    }
}

impl From<lettre::address::AddressError> for DgmError {
    fn from(value: lettre::address::AddressError) -> Self {
        Self::Mail {
            context: "address",
            details: value.to_string(),
        }
    }
}

impl From<lettre::error::Error> for DgmError {
    fn from(value: lettre::error::Error) -> Self {
        Self::Mail {
            context: "builder",
            details: value.to_string(),
        }
    }
}

impl From<lettre::transport::smtp::Error> for DgmError {
    fn from(value: lettre::transport::smtp::Error) -> Self {
        Self::Mail {
            context: "smtp",
            details: value.to_string(),
        }
    }
}
