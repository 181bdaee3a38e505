//! Serial console carrier detect.

use crate::command::CommandRunner;
use crate::error::AgentError;

/// Honour (`-clocal`) or ignore (`clocal`) the DCD line on `device`.
pub async fn apply_ttys_dcd(runner: &dyn CommandRunner, device: &str, enabled: bool) -> Result<(), AgentError> {
    let mode = if enabled { "-clocal" } else { "clocal" };
    runner.run("stty", &["-F", device, mode]).await?;
    Ok(())
}
