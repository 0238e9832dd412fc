//! Invocation of the container CLI.

use std::path::PathBuf;

use ctspec_common::error::{CtspecError, Result};

/// Locates `binary` on `PATH` unless it is already a path.
pub(crate) fn locate(binary: &str) -> Result<PathBuf> {
    which::which(binary).map_err(|e| CtspecError::Runner {
        message: format!("container CLI `{binary}` not found: {e}"),
    })
}

/// Runs the container CLI and returns its trimmed stdout.
pub(crate) fn run(binary: &str, args: &[String]) -> Result<String> {
    let program = locate(binary)?;
    tracing::debug!(program = %program.display(), ?args, "running container CLI");

    let output = std::process::Command::new(&program)
        .args(args)
        .output()
        .map_err(|e| CtspecError::Io {
            command: binary.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(CtspecError::Runner {
            message: format!(
                "`{binary} {}` exited with {}: {}",
                args.join(" "),
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Returns the first non-empty line of CLI output.
pub(crate) fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|line| !line.is_empty())
}
