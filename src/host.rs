//! The host seam.
//!
//! Every side effect of a provisioning run (spawning a program, reading or
//! writing a configuration file, checking privileges, sleeping between
//! retries) goes through the `Host` trait. `SystemHost` talks to the real
//! machine; tests drive the sequencer against an in-memory host.

use crate::command::{CommandOutput, CommandSpec};
use crate::command_runner::run_command_safe;
use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Operations the sequencer needs from the machine it provisions.
pub trait Host {
    /// Run an external program. `Err` means it could not be started at all.
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput>;

    /// Read a file; `Ok(None)` when it does not exist.
    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Create or replace a file, creating parent directories as needed.
    fn write_file(&self, path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()>;

    /// Remove a file; removing a missing file is not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Whether the process runs with elevated privileges.
    fn is_elevated(&self) -> bool;

    /// Block between retry attempts.
    fn sleep(&self, duration: Duration);

    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        Ok(self
            .read_file(path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn file_exists(&self, path: &Path) -> Result<bool> {
        Ok(self.read_file(path)?.is_some())
    }
}

/// The real machine.
///
/// In dry-run mode mutating commands and file writes are logged and skipped;
/// read-only queries still execute so the preview is realistic.
#[derive(Debug, Clone, Default)]
pub struct SystemHost {
    dry_run: bool,
}

impl SystemHost {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

impl Host for SystemHost {
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        if self.dry_run && !cmd.read_only {
            info!("[dry-run] would run: {}", cmd);
            return Ok(CommandOutput::ok(""));
        }
        run_command_safe(cmd)
    }

    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
        if self.dry_run {
            info!("[dry-run] would write {} ({} bytes)", path.display(), contents.len());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        if let Some(mode) = mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
        debug!("wrote {} ({} bytes)", path.display(), contents.len());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            info!("[dry-run] would remove {}", path.display());
            return Ok(());
        }
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_elevated(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }

    fn sleep(&self, duration: Duration) {
        if !self.dry_run {
            std::thread::sleep(duration);
        }
    }
}
