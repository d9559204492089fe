#![deny(unsafe_code)]

//! DGM utility toolkit: leveled file logging and error reporting plus a
//! handful of small helpers shared by automation scripts.
//!
//! Pieces:
//! 1. **Leveled logger**: severity-gated records appended to per-process
//!    general and database sinks, laid out by date under a base directory
//! 2. **Error reporter**: error + reason lines, optional diagnostic capture,
//!    optional process exit
//! 3. **Helpers**: delimiter balancing, shell commands, environment edits,
//!    HTTP fetch, INI lookup, SMTP mail and image color statistics
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use dgm_utils::prelude::*;
//!
//! let config = Config::load(None)?;
//! let logger = Logger::from_config(&config.logging);
//! logger.log(Severity::Info, 0, "starting");
//! logger.report(&ErrorReport::new("lookup failed").cause("timeout"));
//! # Ok::<(), DgmError>(())
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use dgm_utils::text::balance::normalize_delimiters;
//! assert_eq!(normalize_delimiters("(a(b)c"), "a(b)c");
//! ```

pub mod prelude;

pub mod core;
pub mod formats;
pub mod imaging;
pub mod logger;
pub mod mail;
pub mod net;
pub mod platform;
pub mod text;
