//! Bounded subprocess driver for the codex CLI.
//!
//! Every interaction with the CLI goes through [`CodexCli::run`], which
//! enforces a timeout, captures combined output, and salvages whatever was
//! written before a timeout kill. Nothing here is interactive: the CLI is
//! driven with direct pipe capture, which the extraction patterns in
//! `auth::extract` are written to tolerate.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::CliError;
use crate::sanitize::sanitize_bytes;

/// Configuration for driving the codex CLI.
#[derive(Debug, Clone)]
pub struct CodexConfig {
    /// Program to invoke (defaults to `codex`, overridable via
    /// `RELAY_CODEX_COMMAND`)
    pub program: String,
    /// Arguments inserted before each subcommand (from `RELAY_CODEX_COMMAND`
    /// when it contains spaces)
    pub leading_args: Vec<String>,
    /// Timeout for the `login status` probe
    pub probe_timeout: Duration,
    /// Timeout for each `login` invocation variant
    pub login_timeout: Duration,
    /// Timeout for `logout`
    pub logout_timeout: Duration,
    /// Lifetime bound for a chat `exec` run
    pub exec_timeout: Duration,
}

impl Default for CodexConfig {
    fn default() -> Self {
        // Allow overriding the command via environment variable (useful for
        // testing). Supports "command arg1 arg2" format.
        let command_str =
            std::env::var("RELAY_CODEX_COMMAND").unwrap_or_else(|_| "codex".to_string());
        let mut parts = command_str.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "codex".to_string());

        Self {
            program,
            leading_args: parts.collect(),
            probe_timeout: Duration::from_secs(10),
            login_timeout: Duration::from_secs(20),
            logout_timeout: Duration::from_secs(10),
            exec_timeout: Duration::from_secs(180),
        }
    }
}

impl CodexConfig {
    /// Config invoking a specific program with no leading arguments.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            ..Self::default()
        }
    }

    /// Config invoking `program` with fixed leading arguments.
    pub fn with_command(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
            ..Self::default()
        }
    }
}

/// Captured output of one bounded codex invocation.
#[derive(Debug)]
pub struct CliCapture {
    /// Exit code, `None` when killed by the timeout or a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Whether the invocation hit its deadline and was killed
    pub timed_out: bool,
}

impl CliCapture {
    /// Combined stdout+stderr, lossy-decoded and sanitized.
    pub fn combined_text(&self) -> String {
        let mut text = sanitize_bytes(&self.stdout);
        let err = sanitize_bytes(&self.stderr);
        if !err.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&err);
        }
        text.trim().to_string()
    }

    /// Clean exit with code zero.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Handle for invoking the codex CLI with bounded lifetimes.
#[derive(Debug, Clone)]
pub struct CodexCli {
    config: CodexConfig,
}

impl CodexCli {
    pub fn new(config: CodexConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodexConfig {
        &self.config
    }

    /// Locate the codex binary on PATH without spawning anything.
    pub fn resolve_binary(&self) -> Option<PathBuf> {
        which::which(&self.config.program).ok()
    }

    /// Run a codex subcommand, capturing stdout and stderr within `limit`.
    ///
    /// On timeout the child is killed and whatever partial output the pipes
    /// carried is still returned, so callers can mine it for a device code.
    pub async fn run(&self, args: &[&str], limit: Duration) -> Result<CliCapture, CliError> {
        if self.resolve_binary().is_none() {
            return Err(CliError::NotInstalled);
        }

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %self.config.program, ?args, "spawning codex");
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CliError::NotInstalled
            } else {
                CliError::Spawn(e)
            }
        })?;

        // Drain both pipes concurrently so a full pipe can never stall the
        // child past its deadline.
        let stdout_task = tokio::spawn(drain(child.stdout.take()));
        let stderr_task = tokio::spawn(drain(child.stderr.take()));

        let (exit_code, timed_out) = match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => return Err(CliError::Io(e)),
            Err(_) => {
                tracing::warn!(?args, "codex invocation hit its deadline, killing");
                let _ = child.start_kill();
                let _ = child.wait().await;
                (None, true)
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(CliCapture {
            exit_code,
            stdout,
            stderr,
            timed_out,
        })
    }

    /// Probe the CLI's live session state via `codex login status`.
    ///
    /// Short-circuits without spawning when the binary is absent.
    pub async fn is_logged_in(&self) -> bool {
        match self.run(&["login", "status"], self.config.probe_timeout).await {
            Ok(capture) => {
                let text = capture.combined_text().to_lowercase();
                capture.success() && text.contains("logged in") && !text.contains("not logged in")
            }
            Err(_) => false,
        }
    }

    /// Best-effort `codex logout`; failures are logged and swallowed.
    pub async fn logout(&self) {
        match self.run(&["logout"], self.config.logout_timeout).await {
            Ok(capture) if !capture.success() => {
                tracing::debug!(output = %capture.combined_text(), "codex logout reported failure");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("codex logout failed: {e}"),
        }
    }
}

impl Default for CodexCli {
    fn default() -> Self {
        Self::new(CodexConfig::default())
    }
}

async fn drain(pipe: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}
