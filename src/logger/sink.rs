//! Plain-text append-only sink file.
//!
//! Each write opens the file, appends one newline-terminated line and closes
//! it again, so nothing is buffered across calls and a crash never loses an
//! already-returned record. The parent directory is created on demand.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::errors::{DgmError, Result};
use crate::core::paths::{LogPaths, OUTPUT_LINE_SIZE};

/// How a write opens the sink file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Append to existing content.
    Append,
    /// Discard existing content and start with the title banner.
    Truncate,
}

/// One log output file.
#[derive(Debug)]
pub struct Sink {
    path: PathBuf,
    /// Serializes writers inside this process; holds the record count.
    written: Mutex<u64>,
}

impl Sink {
    /// Sink over `path`. Nothing is touched on disk until the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: Mutex::new(0),
        }
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written through this handle since it was created.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        *self.written.lock()
    }

    /// Create the sink's parent directory if missing. Idempotent.
    pub fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| DgmError::io(parent, source))?;
        }
        Ok(())
    }

    /// Write `line` followed by a newline.
    pub fn write_line(&self, line: &str, mode: WriteMode) -> Result<()> {
        let mut written = self.written.lock();
        self.ensure_dir()?;

        let mut file = self.open(mode)?;
        let mut buf = String::with_capacity(line.len() + 1);
        if mode == WriteMode::Truncate {
            buf.push_str(&self.banner());
        }
        buf.push_str(line);
        buf.push('\n');

        // One write_all per record keeps lines whole for tailing readers.
        file.write_all(buf.as_bytes())
            .map_err(|source| DgmError::io(&self.path, source))?;
        *written += 1;
        Ok(())
    }

    /// Three-line title block: rule, centered upper-cased stem, rule.
    #[must_use]
    pub fn banner(&self) -> String {
        let rule = "*".repeat(OUTPUT_LINE_SIZE);
        let title = LogPaths::sink_title(&self.path);
        format!("{rule}\n{title:^width$}\n{rule}\n", width = OUTPUT_LINE_SIZE)
    }

    fn open(&self, mode: WriteMode) -> Result<File> {
        let mut opts = OpenOptions::new();
        match mode {
            WriteMode::Append => opts.create(true).append(true),
            WriteMode::Truncate => opts.create(true).write(true).truncate(true),
        };
        opts.open(&self.path)
            .map_err(|source| DgmError::io(&self.path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directories_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log/2024/01.Jan/02/app_1.log");
        let sink = Sink::new(&path);
        assert!(!path.parent().unwrap().exists());

        sink.write_line("hello", WriteMode::Append).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        assert_eq!(sink.records_written(), 1);
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::new(dir.path().join("a/b/c.log"));
        sink.ensure_dir().unwrap();
        sink.ensure_dir().unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }

    #[test]
    fn append_keeps_previous_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::new(dir.path().join("s.log"));
        sink.write_line("one", WriteMode::Append).unwrap();
        sink.write_line("two", WriteMode::Append).unwrap();
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn truncate_replaces_content_with_banner() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::new(dir.path().join("job_7.log"));
        sink.write_line("old", WriteMode::Append).unwrap();
        sink.write_line("fresh", WriteMode::Truncate).unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "*".repeat(OUTPUT_LINE_SIZE));
        assert_eq!(lines[1].trim(), "JOB_7");
        assert_eq!(lines[1].len(), OUTPUT_LINE_SIZE);
        assert_eq!(lines[2], "*".repeat(OUTPUT_LINE_SIZE));
        assert_eq!(lines[3], "fresh");
    }

    #[test]
    fn unwritable_location_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let sink = Sink::new(blocker.join("sub/app.log"));
        let err = sink.write_line("x", WriteMode::Append).unwrap_err();
        assert_eq!(err.code(), "DGM-3002");
    }
}
