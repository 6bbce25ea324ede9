// src/shell.rs

//! Shell command execution with streamed, captured output
//!
//! Recipe steps run as `bash -c <command>`. Standard output and standard
//! error are each drained by a dedicated reader thread so that a child
//! writing heavily to both pipes can never block on a full pipe buffer.
//! Each line is optionally echoed to our own stdout/stderr and always
//! accumulated in memory.
//!
//! [`ShellCommand::run`] returns only after the child has exited *and* both
//! readers have hit end-of-file, so the captured text is complete at the
//! moment the exit code is known.
//!
//! There is no timeout: a hung child blocks the caller.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Which of our own streams a reader echoes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EchoTarget {
    Stdout,
    Stderr,
}

/// Result of running a shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the shell (-1 if it was killed by a signal)
    pub exit_code: i32,
    /// Everything the command wrote to stdout
    pub stdout: String,
    /// Everything the command wrote to stderr
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A command line to be run under bash
///
/// The child inherits our environment; entries added with [`env`](Self::env)
/// or [`envs`](Self::envs) take precedence over inherited ones.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    command: String,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    echo_output: bool,
    fail_on_error: bool,
}

impl ShellCommand {
    /// Create a command that echoes its output and does not fail on non-zero exit
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            env: BTreeMap::new(),
            echo_output: true,
            fail_on_error: false,
        }
    }

    /// Run the command from `dir` instead of our current directory
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set a single environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables for the child
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.env.insert(key.into(), value.into());
        }
        self
    }

    /// Echo each output line to our own stdout/stderr while capturing it
    pub fn echo_output(mut self, echo: bool) -> Self {
        self.echo_output = echo;
        self
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`]
    pub fn fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    /// Run the command and wait for it and both output readers to finish
    pub fn run(&self) -> Result<CommandOutput> {
        let shell = which::which("bash").map_err(|_| Error::ToolNotFound("bash".to_string()))?;

        debug!("Executing: {}", self.command);

        let mut cmd = Command::new(shell);
        cmd.arg("-c")
            .arg(&self.command)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::IoError(format!("Failed to spawn bash: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::IoError("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::IoError("Failed to capture stderr".to_string()))?;

        let stdout_reader = spawn_reader(stdout, self.echo_output, EchoTarget::Stdout);
        let stderr_reader = spawn_reader(stderr, self.echo_output, EchoTarget::Stderr);

        let status = child
            .wait()
            .map_err(|e| Error::IoError(format!("Failed to wait for bash: {}", e)))?;

        let stdout = join_reader(stdout_reader, "stdout")?;
        let stderr = join_reader(stderr_reader, "stderr")?;

        if self.echo_output {
            let _ = io::stdout().flush();
            let _ = io::stderr().flush();
        }

        let exit_code = status.code().unwrap_or(-1);
        debug!("Command exited with code {}", exit_code);

        if self.fail_on_error && exit_code != 0 {
            error!("{}", stderr.trim_end());
            return Err(Error::CommandFailed {
                command: self.command.clone(),
                exit_code,
                stderr,
            });
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Run a query command and return its trimmed stdout
    ///
    /// Output is never echoed and a non-zero exit is an error. Meant for
    /// commands that print a single value.
    pub fn run_value(&self) -> Result<String> {
        let output = self.clone().echo_output(false).fail_on_error(true).run()?;
        Ok(output.stdout.trim().to_string())
    }
}

/// Drain `stream` line by line on its own thread
fn spawn_reader<R>(stream: R, echo: bool, target: EchoTarget) -> JoinHandle<io::Result<String>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut captured = String::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }

            let text = String::from_utf8_lossy(&line);
            if echo {
                // A closed terminal must not stop us draining the pipe
                let _ = match target {
                    EchoTarget::Stdout => io::stdout().lock().write_all(text.as_bytes()),
                    EchoTarget::Stderr => io::stderr().lock().write_all(text.as_bytes()),
                };
            }
            captured.push_str(&text);
        }

        Ok(captured)
    })
}

fn join_reader(handle: JoinHandle<io::Result<String>>, stream: &str) -> Result<String> {
    match handle.join() {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::IoError(format!("Failed to read {}: {}", stream, e))),
        Err(_) => Err(Error::IoError(format!("{} reader thread panicked", stream))),
    }
}

/// Quote `value` for safe interpolation into a bash command line
pub fn quote(value: &str) -> Result<String> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| Error::ParseError(format!("Cannot quote {:?} for the shell: {}", value, e)))
}

/// Quote a path for safe interpolation into a bash command line
pub fn quote_path(path: &Path) -> Result<String> {
    quote(&path.to_string_lossy())
}
