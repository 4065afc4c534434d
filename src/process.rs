//! External command execution.
//!
//! The pipeline never builds `tokio::process::Command` directly. It describes
//! a command as a [`CommandSpec`] and hands it to a [`CommandRunner`], which
//! lets tests substitute a fake.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

use crate::error::{DiffError, Result};

/// Where a command's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream to our own stdout/stderr
    Inherit,
    /// Discard stdout; stderr is kept for error reports
    Quiet,
    /// Collect stdout and stderr into the result
    Capture,
    /// Write stdout to a file; stderr is inherited
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub output: OutputMode,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            output: OutputMode::Inherit,
        }
    }

    /// Build from an argv-style list; `None` if the list is empty.
    pub fn from_argv(argv: &[String], cwd: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), cwd).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn quiet(mut self) -> Self {
        self.output = OutputMode::Quiet;
        self
    }

    pub fn capture(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = OutputMode::File(path.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Structured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion. An `Err` means the command could not be run at
    /// all; a non-zero exit is reported through [`CommandOutput::code`].
    fn run(&self, command: &CommandSpec) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        match &command.output {
            OutputMode::File(path) => info!(
                "Running (cwd = '{}'): {} > {}",
                command.cwd.display(),
                command,
                path.display()
            ),
            OutputMode::Quiet => info!(
                "Running quietly (cwd = '{}'): {}",
                command.cwd.display(),
                command
            ),
            _ => info!("Running (cwd = '{}'): {}", command.cwd.display(), command),
        }

        let (stdout, stderr) = match &command.output {
            OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
            OutputMode::Quiet => (Stdio::null(), Stdio::piped()),
            OutputMode::Capture => (Stdio::piped(), Stdio::piped()),
            OutputMode::File(path) => {
                (Stdio::from(std::fs::File::create(path)?), Stdio::inherit())
            }
        };

        // `output()` would force both streams to pipes; spawn keeps the modes above
        let child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                error!("{} failed to start: {}", command.program, e);
                DiffError::CommandSpawn {
                    command: command.to_string(),
                    source: e,
                }
            })?;
        let output = child.wait_with_output().await?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `command` and treat any non-zero exit as an error.
pub async fn run_checked<R: CommandRunner>(
    runner: &R,
    command: &CommandSpec,
) -> Result<CommandOutput> {
    let output = runner.run(command).await?;
    if output.success() {
        return Ok(output);
    }

    let status = match output.code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    let msg = format!(
        "{} (cwd = '{}') failed with {}",
        command,
        command.cwd.display(),
        status
    );
    error!("{}", msg);
    Err(DiffError::CommandFailed {
        command: command.to_string(),
        message: if output.stderr.trim().is_empty() {
            msg
        } else {
            format!("{}\n{}", msg, output.stderr.trim_end())
        },
    })
}
