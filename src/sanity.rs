//! Pre-flight sanity checks for runtime environment
//!
//! This module verifies the system environment before any module runs:
//! - Required runtime binaries are present
//! - Running with root privileges (EUID 0)
//!
//! Failures are returned as `Precondition` errors; the binary prints the
//! report and exits with status 1.

use crate::command::CommandSpec;
use crate::error::{ProvisionError, Result};
use crate::host::Host;
use tracing::debug;

/// Result of environment verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }

    /// Operator-facing explanation of what failed.
    pub fn report(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.is_root {
            lines.push("Root privileges required. Run with sudo:".to_string());
            lines.push("    sudo ubuntu-setup".to_string());
        }
        if !self.missing_binaries.is_empty() {
            lines.push(format!("Missing required binaries: {}", self.missing_binaries.join(", ")));
            let packages: Vec<&str> = self
                .missing_binaries
                .iter()
                .map(|b| get_package_for_binary(b))
                .collect();
            lines.push(format!("    sudo apt-get install {}", packages.join(" ")));
        }
        lines
    }
}

/// Required runtime binaries
const REQUIRED_BINARIES: &[&str] = &[
    "bash",       // Shell snippets (nvm, release fetch)
    "apt-get",    // Package installs
    "dpkg-query", // Installed-state queries
    "systemctl",  // Service management
];

/// Optional binaries (warn if missing but don't fail)
const OPTIONAL_BINARIES: &[&str] = &["curl", "snap", "ufw"];

/// Check if a binary is available in PATH
fn binary_exists(host: &dyn Host, name: &str) -> bool {
    let cmd = CommandSpec::new("which").arg(name).read_only();
    host.run(&cmd).map(|output| output.success).unwrap_or(false)
}

/// Map binary names to their Ubuntu package names
fn get_package_for_binary(binary: &str) -> &'static str {
    match binary {
        "bash" => "bash",
        "apt-get" => "apt",
        "dpkg-query" => "dpkg",
        "systemctl" => "systemd",
        "curl" => "curl",
        "snap" => "snapd",
        "ufw" => "ufw",
        _ => "unknown",
    }
}

/// Perform all sanity checks and return the result
pub fn verify_environment(host: &dyn Host) -> SanityCheckResult {
    let missing = REQUIRED_BINARIES
        .iter()
        .filter(|binary| !binary_exists(host, binary))
        .map(|binary| binary.to_string())
        .collect();

    for binary in OPTIONAL_BINARIES {
        if !binary_exists(host, binary) {
            debug!("Optional binary not found: {} (installed by the modules that need it)", binary);
        }
    }

    SanityCheckResult {
        missing_binaries: missing,
        is_root: host.is_elevated(),
    }
}

/// Run the checks and turn a failure into a `Precondition` error.
pub fn run_preflight_checks(host: &dyn Host) -> Result<SanityCheckResult> {
    debug!("Running pre-flight sanity checks...");
    let result = verify_environment(host);
    if !result.is_root {
        return Err(ProvisionError::precondition("must run as root"));
    }
    if !result.missing_binaries.is_empty() {
        return Err(ProvisionError::precondition(format!(
            "missing required binaries: {}",
            result.missing_binaries.join(", ")
        )));
    }
    debug!("Pre-flight checks passed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lists_packages_for_missing_binaries() {
        let result = SanityCheckResult {
            missing_binaries: vec!["dpkg-query".into(), "systemctl".into()],
            is_root: false,
        };
        assert!(!result.is_ok());
        let report = result.report();
        assert!(report[0].contains("Root privileges"));
        assert!(report.iter().any(|l| l.contains("sudo apt-get install dpkg systemd")));
    }

    #[test]
    fn test_ok_result_has_empty_report() {
        let result = SanityCheckResult {
            missing_binaries: vec![],
            is_root: true,
        };
        assert!(result.is_ok());
        assert!(result.report().is_empty());
    }
}
