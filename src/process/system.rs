//! Tokio-backed command runner.

use std::io;
use std::process::Stdio;

use tokio::process::Command;

use super::{CommandFuture, CommandOutput, CommandRunner, CommandSpec};
use crate::error::ProcessError;

/// Runs commands as child processes of the current process.
///
/// Output is captured in full. A child that outlives its timeout is killed
/// when its handle is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Create a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn run_to_completion(spec: CommandSpec) -> Result<CommandOutput, ProcessError> {
        let rendered = spec.display();
        let mut command = Command::new(spec.program());
        command
            .args(spec.arg_list())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in spec.env_vars() {
            command.env(key, value);
        }
        if let Some(dir) = spec.working_directory() {
            command.current_dir(dir);
        }

        tracing::debug!(command = %rendered, "spawning command");
        let child = command
            .spawn()
            .map_err(|e| classify_spawn_error(&e, spec.program(), &rendered))?;

        let timeout = spec.timeout_duration();
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ProcessError::Timeout {
                command: rendered.clone(),
                seconds: timeout.as_secs(),
            })?
            .map_err(|e| ProcessError::Io {
                command: rendered.clone(),
                message: e.to_string(),
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(command = %rendered, exit_code, "command finished");

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: CommandSpec) -> CommandFuture<'_> {
        Box::pin(Self::run_to_completion(spec))
    }
}

fn classify_spawn_error(error: &io::Error, program: &str, rendered: &str) -> ProcessError {
    match error.kind() {
        io::ErrorKind::NotFound => ProcessError::NotFound {
            program: program.to_owned(),
        },
        io::ErrorKind::PermissionDenied => ProcessError::PermissionDenied {
            program: program.to_owned(),
        },
        _ => ProcessError::Io {
            command: rendered.to_owned(),
            message: error.to_string(),
        },
    }
}
