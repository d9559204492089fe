//! Audited environment variable access.
//!
//! Mutation goes through `std::env::set_var`, which is only sound while no
//! other thread reads the environment. The toolkit is single-threaded by
//! contract; callers that spawn threads must finish changing variables first.

use std::env;

use crate::core::errors::{DgmError, Result};
use crate::core::paths::OUTPUT_LINE_SIZE;
use crate::logger::leveled::Logger;
use crate::logger::level::Severity;

/// Variable rewritten by [`change_oracle_home`].
pub const ORACLE_HOME: &str = "ORACLE_HOME";

/// Value of `name`, or `MissingEnvVar` when it is not set.
pub fn get_env(name: &str) -> Result<String> {
    env::var_os(name)
        .map(|value| value.to_string_lossy().into_owned())
        .ok_or_else(|| DgmError::MissingEnvVar {
            name: name.to_string(),
        })
}

/// Replace the value of an existing variable, logging old and new values.
///
/// Nothing changes (and a warning is logged) when `value` is empty or when
/// `name` is not currently set. Returns whether the variable was changed.
pub fn set_env(logger: &Logger, name: &str, value: &str) -> bool {
    let rule = "=".repeat(OUTPUT_LINE_SIZE);
    let title = format!("Changing the environment variable {name}").to_uppercase();

    logger.log(Severity::Info, 0, &rule);
    logger.log(
        Severity::Info,
        1,
        &format!("{title:^width$}", width = OUTPUT_LINE_SIZE),
    );
    logger.log(Severity::Info, 0, &rule);
    logger.log(Severity::Debug, 1, "New value: ");
    logger.log(Severity::Debug, 2, value);

    let changed = if value.is_empty() {
        logger.log(Severity::Warning, 0, "New value is empty");
        false
    } else {
        match env::var_os(name) {
            Some(old) => {
                logger.log(
                    Severity::Debug,
                    1,
                    &format!("Old value: {}", old.to_string_lossy()),
                );
                #[allow(unsafe_code)]
                // SAFETY: single-threaded by module contract (see above).
                unsafe {
                    env::set_var(name, value);
                }
                logger.log(Severity::Debug, 0, &format!("New value: {value}"));
                true
            }
            None => {
                logger.log(
                    Severity::Warning,
                    0,
                    &format!("Environment variable {name} not found."),
                );
                false
            }
        }
    };

    logger.log(Severity::Info, 0, &rule);
    changed
}

/// Point `ORACLE_HOME` at `path`, only when `path` is a client install.
pub fn change_oracle_home(logger: &Logger, path: &str) -> bool {
    if path.contains("client") {
        set_env(logger, ORACLE_HOME, path)
    } else {
        logger.log(
            Severity::Warning,
            0,
            "The key word 'client' was not found on specified path. Changing denied",
        );
        false
    }
}
