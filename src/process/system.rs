//! [`ProcessControl`] using the platform's own tools.
//!
//! - Windows: `tasklist` to list, `taskkill /im` to stop
//! - Unix: `pgrep -x` to list, `pkill -x` to stop
//!
//! On Linux both tools match against the kernel's `comm` name, which keeps only
//! the first 15 bytes of the executable name. Longer names are cut to that
//! length before matching, so two executables sharing those 15 bytes are
//! treated as the same process.

use anyhow::Result;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::core::PatchError;
use crate::process::ProcessControl;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// The real process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcesses;

fn process_error(operation: &str, name: &str, reason: impl std::fmt::Display) -> PatchError {
    PatchError::Process {
        operation: operation.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(target_os = "linux")]
const COMM_LEN: usize = 15;

/// The `pgrep`/`pkill` pattern that matches exactly `name`.
#[cfg(not(windows))]
fn exact_pattern(name: &str) -> String {
    #[cfg(target_os = "linux")]
    let name = {
        let mut end = name.len().min(COMM_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        &name[..end]
    };

    let mut pattern = String::with_capacity(name.len());
    for ch in name.chars() {
        if r"\.^$|?*+()[]{}".contains(ch) {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern
}

fn quiet(program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::null()).stderr(Stdio::piped());
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

impl ProcessControl for SystemProcesses {
    #[cfg(windows)]
    async fn is_running(&self, names: &[&str]) -> Result<bool> {
        if names.is_empty() {
            return Ok(false);
        }

        let output = quiet("tasklist.exe")
            .args(["/FI", "STATUS eq RUNNING", "/fo", "csv", "/nh"])
            .output()
            .await
            .map_err(|e| process_error("query", &names.join(","), e))?;

        if !output.status.success() {
            return Err(process_error(
                "query",
                &names.join(","),
                String::from_utf8_lossy(&output.stderr).trim(),
            )
            .into());
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(names.iter().any(|name| listing.contains(&format!("\"{name}\""))))
    }

    #[cfg(not(windows))]
    async fn is_running(&self, names: &[&str]) -> Result<bool> {
        for name in names {
            let output = quiet("pgrep")
                .arg("-x")
                .arg(exact_pattern(name))
                .stdout(Stdio::null())
                .output()
                .await
                .map_err(|e| process_error("query", name, e))?;

            match output.status.code() {
                Some(0) => return Ok(true),
                Some(1) => {}
                _ => {
                    return Err(process_error(
                        "query",
                        name,
                        String::from_utf8_lossy(&output.stderr).trim(),
                    )
                    .into());
                }
            }
        }
        Ok(false)
    }

    async fn terminate(&self, name: &str) -> Result<()> {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = quiet("taskkill.exe");
            cmd.args(["/im", name]);
            cmd
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = quiet("pkill");
            cmd.arg("-x").arg(exact_pattern(name));
            cmd
        };

        let output = cmd
            .stdout(Stdio::null())
            .output()
            .await
            .map_err(|e| process_error("terminate", name, e))?;

        // A non-zero exit usually means the process exited on its own in the
        // meantime; the caller's poll loop decides whether it is really gone.
        if output.status.success() {
            debug!("Sent termination request to {}", name);
        } else {
            warn!(
                "Termination request for {} exited with {}: {}",
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn launch(&self, executable: &Path) -> Result<()> {
        let mut cmd = Command::new(executable);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        if let Some(dir) = executable.parent() {
            cmd.current_dir(dir);
        }

        cmd.spawn().map_err(|e| {
            process_error("launch", &executable.display().to_string(), e)
        })?;
        Ok(())
    }
}
