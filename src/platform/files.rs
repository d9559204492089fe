//! Waiting on files and comparing file dates.

use std::fs::{self, File};
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

use crate::core::errors::{DgmError, Result};
use crate::logger::leveled::Logger;
use crate::logger::level::Severity;
use crate::logger::reporter::ErrorReport;

const TICK: Duration = Duration::from_secs(1);

/// Layout returned by [`file_date`].
pub const FILE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Sleep `seconds` one second at a time, logging each tick.
pub fn wait(logger: &Logger, seconds: u64, msg: &str, indent: usize) {
    wait_ticks(logger, seconds, msg, indent, TICK);
}

fn wait_ticks(logger: &Logger, ticks: u64, msg: &str, indent: usize, tick: Duration) {
    for n in 1..=ticks {
        thread::sleep(tick);
        if msg.is_empty() {
            logger.log(
                Severity::Debug,
                indent,
                &format!("...waiting {n} second(s)."),
            );
        } else {
            logger.log(Severity::Debug, indent, msg);
        }
    }
}

/// Poll for `path` once per second until it exists and its size holds
/// steady for one tick, or `timeout_secs` elapse.
///
/// A timeout is reported as a non-terminating error and returns `false`.
pub fn wait_for_file(logger: &Logger, path: &Path, timeout_secs: u64, indent: usize) -> bool {
    wait_for_file_ticks(logger, path, timeout_secs, indent, TICK)
}

fn wait_for_file_ticks(
    logger: &Logger,
    path: &Path,
    timeout: u64,
    indent: usize,
    tick: Duration,
) -> bool {
    for _ in 0..timeout {
        match File::open(path).and_then(|f| f.metadata()) {
            Ok(before) => {
                wait_ticks(
                    logger,
                    1,
                    &format!("size file: {}", before.len()),
                    indent,
                    tick,
                );
                let after = fs::metadata(path).map(|m| m.len()).ok();
                if after == Some(before.len()) {
                    return true;
                }
            }
            Err(_) => wait_ticks(logger, 1, "file not found yet", indent, tick),
        }
    }

    logger.report(
        &ErrorReport::new(&format!(
            "even after {timeout} second(s) the file {} was not found. Wait aborted.",
            path.display()
        ))
        .indent(indent),
    );
    false
}

/// Modification date of `path` as `dd/mm/YYYY` (UTC).
pub fn file_date(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| DgmError::io(path, source))?;
    Ok(format_day(modified))
}

/// Whether `path` exists and was last modified on the same UTC day as `day`.
pub fn is_file_from_day(path: &Path, day: SystemTime) -> bool {
    file_date(path).is_ok_and(|date| date == format_day(day))
}

fn format_day(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).format(FILE_DATE_FORMAT).to_string()
}
