//! Host command execution.
//!
//! Collectors and link control go through [`CommandRunner`] so tests can
//! script command output.

use crate::error::AgentError;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Runs external commands. Mocked in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return its stdout. A non-zero exit is an error.
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, AgentError>;
}

/// Runs commands on the local host.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCommandRunner;

#[async_trait]
impl CommandRunner for HostCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, AgentError> {
        debug!("exec {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| AgentError::Command {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AgentError::Command {
                program: program.to_string(),
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
