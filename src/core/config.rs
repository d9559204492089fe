//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DgmError, Result};
use crate::logger::level::Severity;

/// Full toolkit configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub mail: MailConfig,
    /// Path the configuration was loaded from (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Logger threshold and sink layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum severity written to the sinks.
    pub level: Severity,
    /// Root of the `log/`, `files/` and `screenshot/` trees. Defaults to the
    /// directory of the running executable.
    pub base_dir: Option<PathBuf>,
    /// Sink file prefix. Defaults to the executable's file stem.
    pub program_name: Option<String>,
    /// Echo every written record on stdout.
    pub mirror_stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Severity::Debug,
            base_dir: None,
            program_name: None,
            mirror_stdout: true,
        }
    }
}

/// HTTP fetch helper settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Hard wall-clock deadline per request.
    pub timeout_secs: u64,
    /// Skip TLS certificate verification. Insecure; on by default for
    /// compatibility with self-signed intranet endpoints.
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 2,
            accept_invalid_certs: true,
        }
    }
}

/// SMTP settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailConfig {
    /// `host` or `host:port` of the plaintext SMTP relay.
    pub server: Option<String>,
    /// Sender used when a message does not name one.
    pub default_sender: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: None,
            default_sender: "dgm.lib@localhost".to_string(),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[DGM-CONFIG] WARNING: HOME not set, falling back to /tmp");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        home_dir.join(".config").join("dgm").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Config::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| DgmError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let mut parsed: Self = toml::from_str(&raw)?;
            parsed.source = Some(path_buf);
            parsed
        } else if is_explicit_path {
            return Err(DgmError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // logging
        if let Some(raw) = lookup("DGM_LOG_LEVEL") {
            self.logging.level = raw.parse()?;
        }
        if let Some(raw) = lookup("DGM_LOG_BASE_DIR") {
            self.logging.base_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("DGM_LOG_PROGRAM_NAME") {
            self.logging.program_name = Some(raw);
        }
        if let Some(raw) = lookup("DGM_LOG_MIRROR_STDOUT") {
            self.logging.mirror_stdout = parse_env_bool("DGM_LOG_MIRROR_STDOUT", &raw)?;
        }

        // http
        if let Some(raw) = lookup("DGM_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_env_u64("DGM_HTTP_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DGM_HTTP_ACCEPT_INVALID_CERTS") {
            self.http.accept_invalid_certs =
                parse_env_bool("DGM_HTTP_ACCEPT_INVALID_CERTS", &raw)?;
        }

        // mail
        if let Some(raw) = lookup("DGM_MAIL_SERVER") {
            self.mail.server = Some(raw);
        }
        if let Some(raw) = lookup("DGM_MAIL_SENDER") {
            self.mail.default_sender = raw;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(DgmError::InvalidConfig {
                details: "http.timeout_secs must be > 0".to_string(),
            });
        }

        if let Some(name) = &self.logging.program_name
            && (name.is_empty() || name.contains(['/', '\\']))
        {
            return Err(DgmError::InvalidConfig {
                details: format!("logging.program_name must be a bare file name, got {name:?}"),
            });
        }

        if self.mail.default_sender.trim().is_empty() {
            return Err(DgmError::InvalidConfig {
                details: "mail.default_sender must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| DgmError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| DgmError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
