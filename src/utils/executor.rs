//! Command execution abstraction for testability
//!
//! Dump backends and the compress stage run their external tools through
//! [`CommandExecutor`], so tests can record command lines without spawning
//! anything.

use super::command::CommandPolicy;
use anyhow::Result;
use std::process::Output;

/// Runs `sh -c` command lines
pub trait CommandExecutor: Send + Sync {
    fn run_shell_command(&self, command: &str, policy: &CommandPolicy) -> Result<Output>;
}

/// Spawns real subprocesses
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run_shell_command(&self, command: &str, policy: &CommandPolicy) -> Result<Output> {
        super::command::run_shell_command(command, policy)
    }
}

/// Recording executor for tests, usable from external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// What every recorded command "returns"
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
            }
        }
    }

    /// A recorded `sh -c` invocation
    #[derive(Clone, Debug)]
    pub struct ShellCall {
        pub command: String,
        pub policy: CommandPolicy,
    }

    #[derive(Clone, Default)]
    pub struct MockExecutor {
        calls: Arc<Mutex<Vec<ShellCall>>>,
        response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond_with(self, response: MockResponse) -> Self {
            *self.response.lock().unwrap() = response;
            self
        }

        pub fn calls(&self) -> Vec<ShellCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Command lines passed to the shell, in call order
        pub fn shell_commands(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.command).collect()
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run_shell_command(&self, command: &str, policy: &CommandPolicy) -> Result<Output> {
            self.calls.lock().unwrap().push(ShellCall {
                command: command.to_string(),
                policy: *policy,
            });

            match self.response.lock().unwrap().clone() {
                MockResponse::Success { stdout } => Ok(Output {
                    status: std::process::ExitStatus::default(),
                    stdout: stdout.into_bytes(),
                    stderr: Vec::new(),
                }),
                MockResponse::Failure { stderr, exit_code } => {
                    anyhow::bail!("Command failed with exit code {:?}: {}", exit_code, stderr)
                }
                MockResponse::Timeout => anyhow::bail!("Command timed out"),
            }
        }
    }
}
