//! Utilities for running external commands with proper error handling and timeouts

use crate::config::GlobalSettings;
use anyhow::{Context, Result};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::{debug, error, warn};

/// How an external command is supervised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPolicy {
    /// Kill the command after this long (None waits forever)
    pub timeout: Option<Duration>,
    /// Treat a non-zero exit status as a failure
    pub check_exit_status: bool,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::from_settings(&GlobalSettings::default())
    }
}

impl CommandPolicy {
    pub fn from_settings(settings: &GlobalSettings) -> Self {
        Self {
            timeout: settings.command_timeout(),
            check_exit_status: settings.check_exit_status,
        }
    }
}

/// Run a command under the given policy
pub fn run_command(program: &str, args: &[&str], policy: &CommandPolicy) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {} {}", program, args.join(" "));

    let output = match policy.timeout {
        Some(timeout_duration) => run_with_timeout(cmd, program, timeout_duration)?,
        None => cmd
            .output()
            .with_context(|| format!("Failed to execute {}", program))?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if policy.check_exit_status {
            error!("Command failed: {} {}", program, args.join(" "));
            error!("Stderr: {}", stderr);
            anyhow::bail!(
                "Command failed with exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
        }
        warn!(
            "Ignoring exit code {:?} of {} (check_exit_status = false): {}",
            output.status.code(),
            program,
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
        debug!("Command output: {}", stdout);
    }

    Ok(output)
}

/// Run a shell command line through `sh -c`
pub fn run_shell_command(command: &str, policy: &CommandPolicy) -> Result<Output> {
    #[cfg(unix)]
    let (shell, flag) = ("sh", "-c");

    #[cfg(windows)]
    let (shell, flag) = ("cmd", "/C");

    run_command(shell, &[flag, command], policy)
}

/// Quote a value for use as a single word in a `sh -c` command line
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Like [`shell_quote`], but leaves words without shell metacharacters bare
pub fn shell_word(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        shell_quote(value)
    }
}

fn run_with_timeout(cmd: Command, program: &str, timeout: Duration) -> Result<Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start command runtime")?;

    runtime.block_on(async {
        let mut command = tokio::process::Command::from(cmd);
        command.kill_on_drop(true);

        match tokio::time::timeout(timeout, command.output()).await {
            Ok(output) => output.with_context(|| format!("Failed to execute {}", program)),
            Err(_) => Err(anyhow::anyhow!(
                "{} timed out after {:?}",
                program,
                timeout
            )),
        }
    })
}
