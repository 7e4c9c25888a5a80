//! apt and snap integration
//!
//! Typed argument structs for every package-manager invocation, plus thin
//! wrappers that interpret exit status and output. All execution goes through
//! the `Host` seam.
//!
//! # Architecture
//!
//! - `Apt`: index refresh, installed-state query, batch install
//! - `Snap`: classic/strict snap installs for a few GUI applications
//! - `parse_dpkg_status`: pure parser for `dpkg-query` output

use crate::command::{CommandArgs, CommandOutput};
use crate::error::Result;
use crate::host::Host;
use std::time::Duration;
use tracing::{debug, info, warn};

const NONINTERACTIVE: (&str, &str) = ("DEBIAN_FRONTEND", "noninteractive");

// ============================================================================
// Typed arguments
// ============================================================================

/// `apt-get update`
#[derive(Debug, Clone)]
pub struct AptUpdateArgs;

impl CommandArgs for AptUpdateArgs {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["update".to_string(), "-q".to_string()]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![(NONINTERACTIVE.0.to_string(), NONINTERACTIVE.1.to_string())]
    }
}

/// `apt-get install -y --no-install-recommends <packages...>`
#[derive(Debug, Clone)]
pub struct AptInstallArgs {
    pub packages: Vec<String>,
}

impl CommandArgs for AptInstallArgs {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            "-y".to_string(),
            "--no-install-recommends".to_string(),
            "-o".to_string(),
            "Dpkg::Options::=--force-confold".to_string(),
        ];
        args.extend(self.packages.iter().cloned());
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![(NONINTERACTIVE.0.to_string(), NONINTERACTIVE.1.to_string())]
    }
}

/// `apt-get autoremove -y`
#[derive(Debug, Clone)]
pub struct AptAutoremoveArgs;

impl CommandArgs for AptAutoremoveArgs {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["autoremove".to_string(), "-y".to_string()]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![(NONINTERACTIVE.0.to_string(), NONINTERACTIVE.1.to_string())]
    }
}

/// `dpkg-query -W -f=${Status} <package>`
#[derive(Debug, Clone)]
pub struct DpkgQueryArgs {
    pub package: String,
}

impl CommandArgs for DpkgQueryArgs {
    fn program(&self) -> &'static str {
        "dpkg-query"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-W".to_string(),
            "-f=${Status}".to_string(),
            self.package.clone(),
        ]
    }

    fn is_read_only(&self) -> bool {
        true
    }
}

/// `snap list <name>`
#[derive(Debug, Clone)]
pub struct SnapListArgs {
    pub name: String,
}

impl CommandArgs for SnapListArgs {
    fn program(&self) -> &'static str {
        "snap"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["list".to_string(), self.name.clone()]
    }

    fn is_read_only(&self) -> bool {
        true
    }
}

/// `snap install <name> [--classic]`
#[derive(Debug, Clone)]
pub struct SnapInstallArgs {
    pub name: String,
    pub classic: bool,
}

impl CommandArgs for SnapInstallArgs {
    fn program(&self) -> &'static str {
        "snap"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["install".to_string(), self.name.clone()];
        if self.classic {
            args.push("--classic".to_string());
        }
        args
    }
}

// ============================================================================
// Parsers
// ============================================================================

/// Interpret `dpkg-query -W -f=${Status}` output.
///
/// Only `install ok installed` counts; `deinstall ok config-files` (removed
/// but not purged) and half-installed states do not.
pub fn parse_dpkg_status(stdout: &str) -> bool {
    stdout.trim() == "install ok installed"
}

// ============================================================================
// Apt
// ============================================================================

/// apt-get/dpkg wrapper bound to a host.
pub struct Apt<'a> {
    host: &'a dyn Host,
    timeout: Duration,
}

impl<'a> Apt<'a> {
    pub fn new(host: &'a dyn Host, timeout: Duration) -> Self {
        Self { host, timeout }
    }

    /// Refresh the package index. Callers treat failure as best-effort.
    pub fn refresh_index(&self) -> Result<()> {
        info!("refreshing package index");
        let output = self
            .host
            .run(&AptUpdateArgs.to_command().timeout(self.timeout))?;
        output.ensure_success("apt-get update")
    }

    /// Whether `package` is fully installed.
    ///
    /// A query that cannot run counts as "not installed" so the package is
    /// attempted rather than silently skipped.
    pub fn is_installed(&self, package: &str) -> bool {
        let args = DpkgQueryArgs {
            package: package.to_string(),
        };
        match self.host.run(&args.to_command()) {
            Ok(output) => output.success && parse_dpkg_status(&output.stdout),
            Err(e) => {
                debug!("dpkg-query for {} failed: {}", package, e);
                false
            }
        }
    }

    /// One batch install call, bounded by the configured timeout.
    pub fn install(&self, packages: &[String]) -> Result<CommandOutput> {
        let args = AptInstallArgs {
            packages: packages.to_vec(),
        };
        self.host.run(&args.to_command().timeout(self.timeout))
    }

    pub fn autoremove(&self) -> Result<()> {
        let output = self
            .host
            .run(&AptAutoremoveArgs.to_command().timeout(self.timeout))?;
        output.ensure_success("apt-get autoremove")
    }
}

// ============================================================================
// Snap
// ============================================================================

/// snapd wrapper bound to a host.
pub struct Snap<'a> {
    host: &'a dyn Host,
    timeout: Duration,
}

impl<'a> Snap<'a> {
    pub fn new(host: &'a dyn Host, timeout: Duration) -> Self {
        Self { host, timeout }
    }

    pub fn is_installed(&self, name: &str) -> bool {
        let args = SnapListArgs {
            name: name.to_string(),
        };
        self.host
            .run(&args.to_command())
            .map(|output| output.success)
            .unwrap_or(false)
    }

    /// Install a snap unless present. Returns `Ok(false)` when skipped.
    pub fn ensure_installed(&self, name: &str, classic: bool) -> Result<bool> {
        if self.is_installed(name) {
            debug!("snap {} already installed", name);
            return Ok(false);
        }
        let args = SnapInstallArgs {
            name: name.to_string(),
            classic,
        };
        let output = self.host.run(&args.to_command().timeout(self.timeout))?;
        if !output.success {
            warn!("snap install {} failed: {}", name, output.stderr.trim());
        }
        output.ensure_success(&format!("snap install {}", name))?;
        Ok(true)
    }
}
