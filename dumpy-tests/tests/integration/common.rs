//! Common utilities for integration tests
//!
//! This module provides the container cleanup guard and helpers that point
//! dumpy's dump tools at a database running in Docker.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;
use test_utils::write_script;

/// Guard that ensures Docker container cleanup on drop (even on panic)
pub struct ContainerGuard {
    name: String,
}

impl ContainerGuard {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        cleanup_container(&self.name);
    }
}

/// Helper to stop and remove a Docker container
/// The -v flag also removes anonymous volumes associated with the container
fn cleanup_container(name: &str) {
    let _ = Command::new("docker").args(["stop", name]).output();
    let _ = Command::new("docker").args(["rm", "-v", name]).output();
}

/// Helper to check if Docker is available
pub fn is_docker_available() -> bool {
    Command::new("docker")
        .args(["ps"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Unique container name for a test
pub fn container_name(prefix: &str) -> String {
    format!("dumpy-test-{}-{}", prefix, std::process::id())
}

/// `docker run -d --name <name> <args...> <image>`
pub fn start_container(name: &str, image: &str, env: &[&str]) -> Result<ContainerGuard> {
    let mut args = vec!["run", "-d", "--name", name];
    for var in env {
        args.push("-e");
        args.push(var);
    }
    args.push(image);

    let output = Command::new("docker").args(&args).output()?;
    // Guard first so a failed start is still cleaned up
    let guard = ContainerGuard::new(name.to_string());
    if !output.status.success() {
        anyhow::bail!(
            "Failed to start {}: {}",
            image,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(guard)
}

/// Poll `docker exec <name> <probe...>` until it succeeds
pub fn wait_until_ready(name: &str, probe: &[&str]) -> Result<()> {
    for _ in 0..60 {
        let ready = Command::new("docker")
            .arg("exec")
            .arg(name)
            .args(probe)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);

        if ready {
            return Ok(());
        }

        thread::sleep(Duration::from_secs(1));
    }

    anyhow::bail!("Container {} failed to become ready", name)
}

/// Helper to run a command inside the container and return stdout
pub fn docker_exec(name: &str, command: &[&str]) -> Result<String> {
    let output = Command::new("docker")
        .arg("exec")
        .arg(name)
        .args(command)
        .output()?;

    if !output.status.success() {
        anyhow::bail!(
            "docker exec failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Write a local `tool` script that runs `tool` inside the container
pub fn tool_in_container(bin: &Path, container: &str, tool: &str) -> PathBuf {
    write_script(
        bin,
        tool,
        &format!("#!/bin/sh\nexec docker exec {} {} \"$@\"\n", container, tool),
    )
}
