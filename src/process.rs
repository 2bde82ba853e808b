//! Subprocess helpers shared by the toolchain loader and the VCS adapters.
//!
//! Standard error is inherited so the user sees what the external tool says.
//! No timeout is applied; callers block until the child exits.

use crate::error::Error;
use std::process::{Command, Stdio};

pub fn command_line(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Run `cmd` with stdout, stderr and stdin inherited.
pub fn run(cmd: &mut Command) -> Result<(), Error> {
    let command = command_line(cmd);
    log::debug!("running `{}`", command);
    let status = cmd
        .status()
        .map_err(|source| Error::Transport {
            command: command.clone(),
            source,
        })?;
    if !status.success() {
        return Err(Error::CommandFailed {
            command,
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Run `cmd` and capture its stdout.
pub fn output(cmd: &mut Command) -> Result<Vec<u8>, Error> {
    let command = command_line(cmd);
    log::debug!("running `{}`", command);
    let out = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| Error::Transport {
            command: command.clone(),
            source,
        })?;
    if !out.status.success() {
        return Err(Error::CommandFailed {
            command,
            status: out.status.to_string(),
        });
    }
    Ok(out.stdout)
}

/// Whether `cmd` runs and exits zero. Output is discarded.
pub fn succeeds(cmd: &mut Command) -> bool {
    log::debug!("probing `{}`", command_line(cmd));
    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
