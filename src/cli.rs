use clap::Parser;
use std::path::PathBuf;

use crate::settings::CliOverrides;

/// ubuntu-setup - Idempotent provisioning for Ubuntu machines
#[derive(Parser, Debug)]
#[command(name = "ubuntu-setup")]
#[command(about = "Install and harden an Ubuntu machine, one module at a time")]
#[command(version)]
pub struct Cli {
    /// Modules to run: menu digits or names, comma separated
    /// (e.g. `1,2,5`, `core,security`, `all`). Prompted for when omitted.
    pub selection: Option<String>,

    /// User to create and provision (overrides SETUP_USERNAME)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Never reboot at the end, even if asked to
    #[arg(long)]
    pub skip_reboot: bool,

    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Package installs, service changes and file writes are skipped and
    /// logged. Read-only queries (dpkg-query, ufw status) still execute so
    /// the preview is realistic.
    #[arg(long)]
    pub dry_run: bool,

    /// Retry each package of a failed batch on its own
    #[arg(long)]
    pub isolate_failures: bool,

    /// JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the resolved settings to a JSON file and exit
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Append log lines to this file (overrides LOG_FILE)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Never prompt; missing values stay unset
    #[arg(long)]
    pub non_interactive: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            selection: self.selection.clone(),
            username: self.username.clone(),
            skip_reboot: self.skip_reboot,
            dry_run: self.dry_run,
            isolate_failures: self.isolate_failures,
            log_file: self.log_file.clone(),
            non_interactive: self.non_interactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args() {
        let cli = Cli::try_parse_from(["ubuntu-setup"]).unwrap();
        assert!(cli.selection.is_none());
        assert!(!cli.dry_run);
        assert!(!cli.non_interactive);
    }

    #[test]
    fn test_cli_selection_and_flags() {
        let cli = Cli::try_parse_from([
            "ubuntu-setup",
            "1,2,5",
            "--username",
            "ada",
            "--skip-reboot",
            "--dry-run",
            "--isolate-failures",
            "--config",
            "/etc/ubuntu-setup.json",
            "--log-file",
            "/tmp/setup.log",
            "--non-interactive",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.selection.as_deref(), Some("1,2,5"));
        assert_eq!(overrides.username.as_deref(), Some("ada"));
        assert!(overrides.skip_reboot);
        assert!(overrides.dry_run);
        assert!(overrides.isolate_failures);
        assert!(overrides.non_interactive);
        assert_eq!(overrides.log_file, Some(PathBuf::from("/tmp/setup.log")));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ubuntu-setup.json")));
    }

    #[test]
    fn test_cli_save_config() {
        let cli = Cli::try_parse_from(["ubuntu-setup", "core", "--save-config", "out.json"]).unwrap();
        assert_eq!(cli.save_config, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["ubuntu-setup", "--reboot-now"]).is_err());
    }
}
