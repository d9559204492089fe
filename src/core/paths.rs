//! Log sink and working directory layout.
//!
//! Every process writes to its own pair of sink files:
//!
//! ```text
//! <base_dir>/log/<YYYY>/<MM.Mon>/<DD>/<program>_<pid>.log
//! <base_dir>/log/<YYYY>/<MM.Mon>/<DD>/<program>_<pid>_database.log
//! ```
//!
//! The pid in the file name keeps concurrent processes of the same program
//! from sharing a sink.

#![allow(missing_docs)]

use std::env;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::text::format::space_text;

/// Width of the `*` rules framing banners.
pub const OUTPUT_LINE_SIZE: usize = 80;

/// Program name used when the executable name cannot be determined.
pub const FALLBACK_PROGRAM_NAME: &str = "dgm_utils";

/// Resolved per-process file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogPaths {
    pub date: NaiveDate,
    pub base_dir: PathBuf,
    pub program_name: String,
    pub pid: u32,
    pub log_dir: PathBuf,
    pub general_log: PathBuf,
    pub database_log: PathBuf,
    pub files_dir: PathBuf,
    pub screenshot_dir: PathBuf,
}

impl LogPaths {
    /// Build the layout for an explicit base directory, program, date and pid.
    #[must_use]
    pub fn resolve(base_dir: &Path, program_name: &str, date: NaiveDate, pid: u32) -> Self {
        let log_dir = base_dir
            .join("log")
            .join(date.format("%Y").to_string())
            .join(date.format("%m.%b").to_string())
            .join(date.format("%d").to_string());
        let files_dir = base_dir
            .join("files")
            .join(date.format("%Y").to_string())
            .join(date.format("%b").to_string())
            .join(date.format("%d").to_string());

        Self {
            date,
            base_dir: base_dir.to_path_buf(),
            program_name: program_name.to_string(),
            pid,
            general_log: log_dir.join(format!("{program_name}_{pid}.log")),
            database_log: log_dir.join(format!("{program_name}_{pid}_database.log")),
            log_dir,
            files_dir,
            screenshot_dir: base_dir.join("screenshot"),
        }
    }

    /// Layout for the running process, dated today.
    ///
    /// `base_dir` defaults to the directory of the invoked executable and
    /// `program_name` to its file stem.
    #[must_use]
    pub fn for_current_process(base_dir: Option<&Path>, program_name: Option<&str>) -> Self {
        let invoked = env::args_os().next().map(PathBuf::from);

        let base = base_dir.map_or_else(
            || {
                invoked
                    .as_deref()
                    .and_then(Path::parent)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
            },
            Path::to_path_buf,
        );

        let program = program_name.map_or_else(
            || {
                invoked
                    .as_deref()
                    .and_then(Path::file_stem)
                    .map_or_else(
                        || FALLBACK_PROGRAM_NAME.to_string(),
                        |s| s.to_string_lossy().into_owned(),
                    )
            },
            str::to_string,
        );

        Self::resolve(
            &resolve_absolute_path(&base),
            &program,
            chrono::Local::now().date_naive(),
            std::process::id(),
        )
    }

    /// Upper-cased file stem of a sink, used as the truncation banner title.
    #[must_use]
    pub fn sink_title(sink: &Path) -> String {
        sink.file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().to_uppercase())
    }

    /// Framed startup summary of the resolved layout.
    #[must_use]
    pub fn banner(&self) -> String {
        let rule = "*".repeat(OUTPUT_LINE_SIZE);
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{}", space_text("DGM LIB", " "));
        let _ = writeln!(out, "{rule}");
        for (label, value) in [
            ("date", self.date.to_string()),
            ("dir_log", self.log_dir.display().to_string()),
            ("base_dir", self.base_dir.display().to_string()),
            ("file_log", self.general_log.display().to_string()),
            ("file_name", self.program_name.clone()),
            ("files_directory", self.files_dir.display().to_string()),
            ("database_log_file", self.database_log.display().to_string()),
        ] {
            let _ = writeln!(out, "{label:.<17}: {value}");
        }
        let _ = writeln!(out, "{rule}");
        out
    }
}

/// Resolve a path to an absolute, normalized path.
///
/// Existing paths are canonicalized. Missing ones are joined to the CWD and
/// `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
