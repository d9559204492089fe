#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_dgmu") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "dgmu.exe" } else { "dgmu" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve dgmu binary path for integration test"),
    }
}

/// Isolated HOME and log base directory for one or more CLI runs.
pub struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create sandbox dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn base_dir(&self) -> PathBuf {
        self.dir.path().join("base")
    }

    pub fn run(&self, case_name: &str, args: &[&str]) -> CmdResult {
        self.run_with_env(case_name, args, &[])
    }

    pub fn run_with_env(&self, case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
        let root = std::env::temp_dir().join("dgmu-test-logs");
        fs::create_dir_all(&root).expect("create temp test log dir");

        let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
        let bin_path = resolve_bin_path();

        let mut command = Command::new(&bin_path);
        command
            .args(args)
            .env("HOME", self.path())
            .env("DGM_LOG_BASE_DIR", self.base_dir())
            .env("DGM_LOG_PROGRAM_NAME", "dgmu")
            .env("DGM_OUTPUT_FORMAT", "human")
            .env("RUST_BACKTRACE", "1");
        for name in [
            "DGM_LOG_LEVEL",
            "DGM_LOG_MIRROR_STDOUT",
            "DGM_HTTP_TIMEOUT_SECS",
            "DGM_HTTP_ACCEPT_INVALID_CERTS",
            "DGM_MAIL_SERVER",
            "DGM_MAIL_SENDER",
        ] {
            command.env_remove(name);
        }
        for (key, value) in env {
            command.env(key, value);
        }
        let output = command.output().expect("execute dgmu command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let mut log_content = String::new();
        log_content.push_str(&format!("case={case_name}\n"));
        log_content.push_str(&format!("bin={}\n", bin_path.display()));
        log_content.push_str(&format!("args={args:?}\n"));
        log_content.push_str(&format!("status={}\n", output.status));
        log_content.push_str("----- stdout -----\n");
        log_content.push_str(&stdout);
        log_content.push('\n');
        log_content.push_str("----- stderr -----\n");
        log_content.push_str(&stderr);
        log_content.push('\n');
        fs::write(&log_path, log_content).expect("write test log");

        CmdResult {
            status: output.status,
            stdout,
            stderr,
            log_path,
        }
    }

    /// Contents of every general sink written under the base directory.
    pub fn general_logs(&self) -> String {
        self.sink_contents(|name| !name.ends_with("_database.log"))
    }

    /// Contents of every database sink written under the base directory.
    pub fn database_logs(&self) -> String {
        self.sink_contents(|name| name.ends_with("_database.log"))
    }

    fn sink_contents(&self, keep: impl Fn(&str) -> bool) -> String {
        let mut files = Vec::new();
        collect_logs(&self.base_dir().join("log"), &mut files);
        files.sort();
        files
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| keep(&name.to_string_lossy()))
            })
            .map(|path| fs::read_to_string(path).unwrap_or_default())
            .collect()
    }
}

fn collect_logs(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_logs(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "log") {
            out.push(path);
        }
    }
}

/// Run one CLI case in a throwaway sandbox.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    Sandbox::new().run(case_name, args)
}
