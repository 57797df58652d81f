//! Native command execution.

use crate::error::NativeError;
use crate::invocation::Invocation;
use crate::Result;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Captured result of one finished invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    /// A successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, the way a terminal would have shown them.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    /// Turn a non-zero exit into [`NativeError::Failed`].
    pub fn into_result(self, invocation: &Invocation) -> Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(NativeError::Failed {
                command: invocation.to_string(),
                exit_code: self.exit_code,
                output: self.combined(),
            })
        }
    }
}

/// Runs native invocations to completion.
///
/// A non-zero exit is reported through [`CommandOutput::exit_code`], not as an
/// error; only failures to run the program at all are errors.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` and wait for it to exit.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run `invocation` and fail unless it exits with code 0.
    async fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.run(invocation).await?.into_result(invocation)
    }
}

/// Runner that spawns real subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Create a runner without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any invocation still running after `secs` seconds. Zero disables.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        if invocation.program.is_empty() {
            return Err(NativeError::EmptyCommand);
        }
        let start = Instant::now();
        debug!(command = %invocation, cwd = ?invocation.cwd, "Running native command");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|source| NativeError::Spawn {
            command: invocation.to_string(),
            source,
        })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| NativeError::Timeout {
                    command: invocation.to_string(),
                    secs: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(command = %invocation, exit_code, duration_ms, "Native command finished");

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        })
    }
}
