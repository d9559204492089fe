//! Run a shell command line and capture its standard output.

use std::process::{Command, Output};

use crate::logger::leveled::Logger;
use crate::logger::level::Severity;

/// Returned when the command could not produce usable output.
pub const COMMAND_NOT_EXECUTED: &str = "command not executed";

/// Exit status whose partial output is still returned to the caller.
pub const PARTIAL_OUTPUT_EXIT_CODE: i32 = 255;

/// Execute `command` through the platform shell and return its stdout.
///
/// Blocks until the child exits. A zero exit returns the output; exit status
/// 255 returns whatever was captured; any other failure, including a spawn
/// failure, returns [`COMMAND_NOT_EXECUTED`].
pub fn run_command(logger: &Logger, command: &str) -> String {
    logger.log(Severity::Info, 0, "execute command");
    logger.log(Severity::Debug, 1, command);

    let output = match shell(command).output() {
        Ok(output) => output,
        Err(e) => {
            logger.log(Severity::Warning, 1, &format!("could not start shell: {e}"));
            return COMMAND_NOT_EXECUTED.to_string();
        }
    };

    interpret(logger, &output)
}

fn interpret(logger: &Logger, output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return stdout;
    }

    match output.status.code() {
        Some(PARTIAL_OUTPUT_EXIT_CODE) => {
            logger.log(
                Severity::Warning,
                1,
                "command exited with status 255, keeping partial output",
            );
            stdout
        }
        code => {
            let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            logger.log(
                Severity::Warning,
                1,
                &format!("command failed with status {status}"),
            );
            COMMAND_NOT_EXECUTED.to_string()
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
