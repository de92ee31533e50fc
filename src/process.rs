//! External process execution.
//!
//! Every download, extraction and build step goes through a
//! [`CommandRunner`]. Commands are either a shell string (pipelines,
//! redirection) or an argument vector executed without a shell. The
//! escaped command line is logged before execution and any non-zero exit
//! becomes a [`ProcessError`].

use anyhow::{bail, Result};
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::info;

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("refusing to run an empty argument vector")]
    Empty,

    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: ExitStatus },

    #[error("cannot shell-quote {0:?}")]
    Unquotable(String),
}

impl ProcessError {
    /// Exit code of the failed child, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Interpreted by `sh -c`.
    Shell(String),
    /// Executed directly, no shell interpretation.
    Args(Vec<String>),
}

impl Cmd {
    pub fn shell(line: impl Into<String>) -> Self {
        Self::Shell(line.into())
    }

    pub fn args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Args(args.into_iter().map(Into::into).collect())
    }

    /// The command line as it would be typed into a shell.
    pub fn render(&self) -> String {
        match self {
            Self::Shell(line) => line.clone(),
            Self::Args(args) => shlex::try_join(args.iter().map(String::as_str))
                .unwrap_or_else(|_| format!("{args:?}")),
        }
    }

    fn to_command(&self) -> Result<Command, ProcessError> {
        match self {
            Self::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                Ok(cmd)
            }
            Self::Args(args) => {
                let (program, rest) = args.split_first().ok_or(ProcessError::Empty)?;
                let mut cmd = Command::new(program);
                cmd.args(rest);
                Ok(cmd)
            }
        }
    }
}

/// Executes commands on behalf of the installer.
pub trait CommandRunner {
    /// Run and return stdout with trailing whitespace trimmed.
    fn capture(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<String, ProcessError>;

    /// Run with stdout and stderr passed through to the console.
    fn run(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<(), ProcessError>;
}

/// Runs commands on the real host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn prepare(cmd: &Cmd, cwd: Option<&Path>) -> Result<Command, ProcessError> {
        log_command(cmd, cwd);
        let mut command = cmd.to_command()?;
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        Ok(command)
    }
}

impl CommandRunner for SystemRunner {
    fn capture(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<String, ProcessError> {
        let output = Self::prepare(cmd, cwd)?
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| ProcessError::Spawn {
                command: cmd.render(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessError::Failed {
                command: cmd.render(),
                status: output.status,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn run(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<(), ProcessError> {
        let status = Self::prepare(cmd, cwd)?
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| ProcessError::Spawn {
                command: cmd.render(),
                source,
            })?;

        if !status.success() {
            return Err(ProcessError::Failed {
                command: cmd.render(),
                status,
            });
        }
        Ok(())
    }
}

fn log_command(cmd: &Cmd, cwd: Option<&Path>) {
    let line = cmd.render();
    match cwd {
        Some(dir) => info!(cwd = %dir.display(), "+ {line}"),
        None => info!("+ {line}"),
    }
}

/// Quote a single word for inclusion in a shell command line.
pub fn shell_quote(word: &str) -> Result<String, ProcessError> {
    shlex::try_quote(word)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| ProcessError::Unquotable(word.to_string()))
}

/// Quote a path for inclusion in a shell command line.
pub fn quote_path(path: &Path) -> Result<String, ProcessError> {
    let word = path
        .to_str()
        .ok_or_else(|| ProcessError::Unquotable(path.display().to_string()))?;
    shell_quote(word)
}

/// Fail with a readable message when a required input file is missing.
pub fn ensure_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} not found at: {}", what, path.display());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! A runner that records commands instead of executing them.

    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    type Hook = Box<dyn Fn(&Cmd, Option<&Path>) -> Result<String, ProcessError>>;

    pub(crate) struct RecordingRunner {
        calls: RefCell<Vec<(String, Option<PathBuf>)>>,
        hook: Hook,
    }

    impl RecordingRunner {
        /// `hook` simulates the command's effects and supplies its stdout.
        pub(crate) fn new(
            hook: impl Fn(&Cmd, Option<&Path>) -> Result<String, ProcessError> + 'static,
        ) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                hook: Box::new(hook),
            }
        }

        pub(crate) fn silent() -> Self {
            Self::new(|_, _| Ok(String::new()))
        }

        pub(crate) fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
        }

        /// Working directory of every recorded call, in order.
        pub(crate) fn cwds(&self) -> Vec<Option<PathBuf>> {
            self.calls.borrow().iter().map(|(_, d)| d.clone()).collect()
        }

        pub(crate) fn count_containing(&self, needle: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|(c, _)| c.contains(needle))
                .count()
        }

        fn record(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<String, ProcessError> {
            self.calls
                .borrow_mut()
                .push((cmd.render(), cwd.map(Path::to_path_buf)));
            (self.hook)(cmd, cwd)
        }
    }

    impl CommandRunner for RecordingRunner {
        fn capture(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<String, ProcessError> {
            self.record(cmd, cwd)
        }

        fn run(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<(), ProcessError> {
            self.record(cmd, cwd).map(|_| ())
        }
    }
}
