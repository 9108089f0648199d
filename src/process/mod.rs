//! External command execution.
//!
//! Every interaction with the Python toolchain goes through the
//! [`CommandRunner`] seam so the pipeline can be exercised without spawning
//! processes. [`SystemCommandRunner`] is the tokio-backed implementation.

mod system;

pub use system::SystemCommandRunner;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::error::ProcessError;

/// Default timeout applied when a [`CommandSpec`] does not set one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(900);

/// Number of output lines kept when a failure is summarised.
const TAIL_LINES: usize = 20;

/// Boxed future type returned by [`CommandRunner`] implementors.
pub type CommandFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, ProcessError>> + Send + 'a>>;

/// Behaviour required to run an external command to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `spec` and capture its output.
    fn run(&self, spec: CommandSpec) -> CommandFuture<'_>;
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    working_dir: Option<Utf8PathBuf>,
    timeout: Duration,
}

impl CommandSpec {
    /// Start describing a command that runs `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run the child in `dir`.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill the child if it runs longer than `timeout`.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument list.
    #[must_use]
    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    /// Extra environment variables for the child.
    #[must_use]
    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Working directory, if set.
    #[must_use]
    pub fn working_directory(&self) -> Option<&Utf8PathBuf> {
        self.working_dir.as_ref()
    }

    /// Timeout applied to the child.
    #[must_use]
    pub const fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// Render the command line for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        self.to_string()
    }

    /// Returns whether the argument list contains every item of `needle` in
    /// order and adjacent.
    #[must_use]
    pub fn has_args(&self, needle: &[&str]) -> bool {
        needle.is_empty()
            || self
                .args
                .windows(needle.len())
                .any(|window| window.iter().zip(needle).all(|(arg, want)| arg == want))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `-1` when the child was terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Build a successful output with the given stdout.
    #[must_use]
    pub fn success_with(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Build a failed output with the given exit code and stderr.
    #[must_use]
    pub fn failure_with(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns whether stdout or stderr contains `needle`, ignoring case.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        let lowered = needle.to_ascii_lowercase();
        self.stdout.to_ascii_lowercase().contains(&lowered)
            || self.stderr.to_ascii_lowercase().contains(&lowered)
    }

    /// Summarise a failure: the last lines of stderr, or of stdout when
    /// stderr is empty, prefixed with the exit code.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        let stream = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let tail = tail_lines(stream, TAIL_LINES);
        if tail.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {tail}", self.exit_code)
        }
    }
}

/// Keep the last `count` non-blank lines of `text`, joined with newlines.
fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(count);
    lines
        .iter()
        .skip(skip)
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
