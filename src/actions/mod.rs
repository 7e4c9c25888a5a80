//! Configuration actions.
//!
//! Each action is an idempotent mutation of system state that goes through
//! the `Host` seam and reports what it did as an `ActionOutcome`. Errors are
//! returned to the sequencer, which downgrades them to summary warnings.
//!
//! Files we own outright are written with `apply_file`; files whose breakage
//! would lock the operator out (`sshd`, nginx) go through
//! `apply_guarded_file`, which validates the new contents and restores the
//! previous bytes when validation fails.

pub mod backup;
pub mod cron;
pub mod devtools;
pub mod fail2ban;
pub mod firewall;
pub mod nginx;
pub mod release;
pub mod ssh;
pub mod system;
pub mod users;

use crate::command::{CommandOutput, CommandSpec};
use crate::documents::ManagedBlock;
use crate::error::{ProvisionError, Result};
use crate::host::Host;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// What an action did to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Changed,
    Unchanged,
    /// New contents failed validation and the previous state was restored
    RolledBack(String),
    Skipped(String),
}

impl ActionOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed)
    }

    /// Combine the outcomes of two steps of the same action.
    pub fn merge(self, other: ActionOutcome) -> ActionOutcome {
        match (self, other) {
            (Self::RolledBack(r), _) | (_, Self::RolledBack(r)) => Self::RolledBack(r),
            (Self::Changed, _) | (_, Self::Changed) => Self::Changed,
            (Self::Unchanged, _) | (_, Self::Unchanged) => Self::Unchanged,
            (Self::Skipped(r), Self::Skipped(_)) => Self::Skipped(r),
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed => write!(f, "changed"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::RolledBack(reason) => write!(f, "rolled back: {}", reason),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Run a command and turn a non-zero exit into an error.
pub fn run_checked(host: &dyn Host, cmd: &CommandSpec, context: &str) -> Result<CommandOutput> {
    let output = host.run(cmd)?;
    output.ensure_success(context)?;
    Ok(output)
}

/// Run a query and return its trimmed stdout, or `None` if it failed.
pub fn query(host: &dyn Host, cmd: &CommandSpec) -> Option<String> {
    match host.run(cmd) {
        Ok(output) if output.success => Some(output.stdout.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            debug!("query `{}` could not run: {}", cmd, e);
            None
        }
    }
}

/// Write `contents` to `path` unless it already holds exactly those bytes.
pub fn apply_file(host: &dyn Host, path: &Path, contents: &[u8], mode: Option<u32>) -> Result<ActionOutcome> {
    if host.read_file(path)?.as_deref() == Some(contents) {
        return Ok(ActionOutcome::Unchanged);
    }
    host.write_file(path, contents, mode)?;
    Ok(ActionOutcome::Changed)
}

/// Write `contents` to `path`, then run `validate`.
///
/// When validation fails the file is restored byte-for-byte, or removed if
/// it did not exist before, and `RolledBack` is returned.
pub fn apply_guarded_file(
    host: &dyn Host,
    path: &Path,
    contents: &[u8],
    mode: Option<u32>,
    validate: &CommandSpec,
) -> Result<ActionOutcome> {
    let previous = host.read_file(path)?;
    if previous.as_deref() == Some(contents) {
        return Ok(ActionOutcome::Unchanged);
    }

    host.write_file(path, contents, mode)?;

    let failure = match host.run(validate) {
        Ok(output) if output.success => None,
        Ok(output) => Some(format!("`{}` rejected the new configuration: {}", validate, output.stderr.trim())),
        Err(e) => Some(format!("`{}` could not run: {}", validate, e)),
    };
    let Some(reason) = failure else {
        return Ok(ActionOutcome::Changed);
    };

    warn!("{}; restoring {}", reason, path.display());
    match previous {
        Some(bytes) => host.write_file(path, &bytes, None)?,
        None => host.remove_file(path)?,
    }
    Ok(ActionOutcome::RolledBack(reason))
}

/// Upsert a marker-delimited block into a file we share with others.
pub fn apply_managed_block(host: &dyn Host, path: &Path, block: &ManagedBlock, body: &str) -> Result<ActionOutcome> {
    let current = host.read_to_string(path)?.unwrap_or_default();
    let updated = block.upsert(&current, body);
    if updated == current {
        return Ok(ActionOutcome::Unchanged);
    }
    host.write_file(path, updated.as_bytes(), None)?;
    Ok(ActionOutcome::Changed)
}

/// Turn a `RolledBack` outcome into a validation error.
pub fn reject_rollback(outcome: ActionOutcome) -> Result<ActionOutcome> {
    match outcome {
        ActionOutcome::RolledBack(reason) => Err(ProvisionError::validation(reason)),
        other => Ok(other),
    }
}
