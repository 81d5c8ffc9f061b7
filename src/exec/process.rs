// src/exec/process.rs

//! Shell process runner used by command steps.

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use crate::types::BuildMode;

/// Number of stderr lines kept in a failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Run `cmdline` through the platform shell in `work_dir` and wait for it.
///
/// The child is killed if the returned future is dropped (e.g. on Ctrl-C).
pub async fn run_shell(label: &str, cmdline: &str, work_dir: &Path, mode: BuildMode) -> Result<()> {
    info!(transform = %label, cmd = %cmdline, "running command");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmdline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmdline);
        c
    };

    cmd.current_dir(work_dir)
        .env("ASSETDAG_MODE", mode.as_str())
        .env("ASSETDAG_PRODUCTION", if mode.is_production() { "1" } else { "0" })
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning `{cmdline}` for '{label}'"))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(transform = %label, "stdout: {}", line);
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        bail!("`{cmdline}` exited with code {code}: {}", tail.trim());
    }

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!(transform = %label, "stderr: {}", line);
    }

    Ok(())
}
