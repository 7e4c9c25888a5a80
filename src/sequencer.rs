//! Provisioning sequencer.
//!
//! Runs the selected modules in canonical order against a `Host`:
//!
//! ```text
//! preconditions -> core -> security -> server -> desktop -> gui
//!               -> vm-guest -> hyperv-guest -> finalize -> (reboot)
//! ```
//!
//! # Failure Policy
//!
//! Only preconditions are fatal: the host must be elevated, and `core` needs
//! a username. Inside a module every package failure is recorded and every
//! configuration failure becomes a summary warning, then the next step runs.
//! No error crosses a module boundary.

use crate::actions::{self, ActionOutcome};
use crate::actions::{backup, cron, devtools, fail2ban, firewall, nginx, ssh, system, users};
use crate::command::CommandSpec;
use crate::console;
use crate::documents::ManagedBlock;
use crate::error::{ProvisionError, Result};
use crate::host::Host;
use crate::installer::{BatchInstaller, BatchKind};
use crate::module_state::ModuleTracker;
use crate::package_manager::{Apt, Snap};
use crate::profiles;
use crate::selection::Selection;
use crate::settings::Settings;
use crate::summary::{PackageRecord, Summary};
use crate::types::{ModuleId, PackageStatus};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SUMMARY_FILE_NAME: &str = "ubuntu-setup-summary.txt";

pub const INITRAMFS_MODULES: &str = "/etc/initramfs-tools/modules";

/// Run the selection. See the module docs for the failure policy.
pub fn run(selection: &Selection, settings: &Settings, host: &dyn Host) -> Result<Summary> {
    if !host.is_elevated() {
        return Err(ProvisionError::precondition("must run as root (try sudo)"));
    }
    if selection.contains(ModuleId::Core) && settings.username.is_none() {
        return Err(ProvisionError::missing_input(
            "a username is required for the core module (use --username or SETUP_USERNAME)",
        ));
    }

    let mut summary = Summary::new();
    for token in selection.ignored() {
        summary.warn(format!("ignored unknown module selection {:?}", token));
    }
    if selection.is_empty() {
        console::warning("No modules selected; nothing to do");
        return Ok(summary);
    }

    let mut sequencer = Sequencer::new(host, settings, selection);
    sequencer.run_modules(&mut summary)?;
    sequencer.finalize(&mut summary);
    Ok(summary)
}

struct Sequencer<'a> {
    host: &'a dyn Host,
    settings: &'a Settings,
    selection: &'a Selection,
    installer: BatchInstaller<'a>,
    tracker: ModuleTracker,
    started: DateTime<Local>,
}

impl<'a> Sequencer<'a> {
    fn new(host: &'a dyn Host, settings: &'a Settings, selection: &'a Selection) -> Self {
        Self {
            host,
            settings,
            selection,
            installer: BatchInstaller::new(host, settings.retry, settings.isolate_failures),
            tracker: ModuleTracker::new(),
            started: Local::now(),
        }
    }

    fn username(&self) -> Option<&'a str> {
        self.settings.username.as_deref()
    }

    fn run_modules(&mut self, summary: &mut Summary) -> Result<()> {
        let selection = self.selection;
        for module in selection.iter() {
            console::heading(module.title());
            self.tracker.start(module)?;
            match module {
                ModuleId::Core => self.core(summary),
                ModuleId::Security => self.security(summary),
                ModuleId::Server => self.server(summary),
                ModuleId::Desktop => self.desktop(summary),
                ModuleId::Gui => self.gui(summary),
                ModuleId::VmGuest => self.vm_guest(summary),
                ModuleId::HypervGuest => self.hyperv_guest(summary),
            }
            self.tracker.complete(module)?;
            summary.mark_completed(module);
            console::success(&format!("{} complete", module.title()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    fn packages(&self, module: ModuleId, summary: &mut Summary) {
        let required = profiles::packages(module, &self.settings.python_version);
        let records = self.installer.install(module, &required, BatchKind::Required, summary);
        report_records(&records);

        let optional: Vec<String> = profiles::optional_packages(module)
            .iter()
            .map(|p| p.to_string())
            .collect();
        if !optional.is_empty() {
            let records = self.installer.install(module, &optional, BatchKind::Optional, summary);
            report_records(&records);
        }
    }

    fn services(&self, module: ModuleId, summary: &mut Summary) {
        for unit in profiles::services(module) {
            step(summary, &format!("enable {}", unit), system::enable_service(self.host, unit));
        }
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    fn core(&self, summary: &mut Summary) {
        let Some(username) = self.username() else {
            return;
        };

        let timestamp = self.started.format("%Y%m%d-%H%M%S").to_string();
        match backup::backup_configs(
            self.host,
            &self.settings.backup_dir,
            backup::BACKUP_SOURCES,
            &timestamp,
            self.started.timestamp().max(0) as u64,
        ) {
            Ok(Some(path)) => summary.add_artifact(ModuleId::Core, "Configuration backup", path),
            Ok(None) => info!("no configuration files to back up"),
            Err(e) => warn_step(summary, "configuration backup", &e),
        }

        self.packages(ModuleId::Core, summary);

        step(summary, &format!("user {}", username), users::ensure_user(self.host, username));
        step(
            summary,
            &format!("{} in sudo group", username),
            users::ensure_group_membership(self.host, username, "sudo"),
        );
        step(
            summary,
            &format!("timezone {}", self.settings.timezone),
            system::set_timezone(self.host, &self.settings.timezone),
        );
        step(
            summary,
            "git identity",
            users::configure_git_identity(
                self.host,
                username,
                self.settings.git_user_name.as_deref(),
                self.settings.git_user_email.as_deref(),
            ),
        );

        let home = users::home_dir(self.host, Some(username));
        match users::ensure_ssh_key(self.host, username, &home) {
            Ok((outcome, public_key)) => {
                report_outcome("SSH key", &outcome);
                summary.add_artifact(ModuleId::Core, "SSH public key", public_key);
            }
            Err(e) => warn_step(summary, "SSH key", &e),
        }
    }

    fn security(&self, summary: &mut Summary) {
        self.packages(ModuleId::Security, summary);
        self.services(ModuleId::Security, summary);

        step(
            summary,
            "SSH hardening",
            ssh::harden_ssh(self.host, self.username()).and_then(actions::reject_rollback),
        );
        let ports = firewall::firewall_ports(self.selection.contains(ModuleId::Server));
        step(summary, "firewall", firewall::configure_firewall(self.host, &ports));
        step(summary, "fail2ban jail", fail2ban::configure_fail2ban(self.host));
        step(summary, "maintenance cron job", cron::schedule_maintenance(self.host));
        step(
            summary,
            "unattended upgrades",
            system::enable_unattended_upgrades(self.host),
        );
    }

    fn server(&self, summary: &mut Summary) {
        self.packages(ModuleId::Server, summary);
        self.services(ModuleId::Server, summary);

        step(
            summary,
            "nginx hardening",
            nginx::harden_nginx(self.host).and_then(actions::reject_rollback),
        );

        let Some(username) = self.username() else {
            console::warning("No user configured; skipping docker group, nvm and pipx");
            summary.warn("server: no user configured, per-user toolchains skipped");
            return;
        };
        let timeout = self.settings.retry.timeout;
        let home = users::home_dir(self.host, Some(username));

        step(
            summary,
            &format!("{} in docker group", username),
            users::ensure_group_membership(self.host, username, "docker"),
        );
        step(
            summary,
            &format!("nvm and Node.js {}", self.settings.node_version),
            devtools::install_nvm(self.host, username, &home, &self.settings.node_version, timeout),
        );
        step(
            summary,
            "pipx tools",
            devtools::install_pipx_tools(self.host, username, devtools::PIPX_TOOLS, timeout),
        );
    }

    fn desktop(&self, summary: &mut Summary) {
        self.packages(ModuleId::Desktop, summary);
        self.services(ModuleId::Desktop, summary);

        if let Err(e) = system::refresh_font_cache(self.host) {
            warn_step(summary, "font cache", &e);
        }
        step(
            summary,
            "graphical boot target",
            system::set_default_target(self.host, "graphical.target"),
        );
    }

    fn gui(&self, summary: &mut Summary) {
        self.packages(ModuleId::Gui, summary);

        let snap = Snap::new(self.host, self.settings.retry.timeout);
        for app in profiles::snaps(ModuleId::Gui) {
            let mut record = PackageRecord::pending(app.name, ModuleId::Gui);
            record.attempts = 1;
            match snap.ensure_installed(app.name, app.classic) {
                Ok(true) => record.status = PackageStatus::Installed,
                Ok(false) => {
                    record.status = PackageStatus::AlreadyPresent;
                    record.attempts = 0;
                }
                Err(e) => {
                    warn_step(summary, &format!("snap {}", app.name), &e);
                    continue;
                }
            }
            summary.record(&record);
        }
    }

    fn vm_guest(&self, summary: &mut Summary) {
        self.packages(ModuleId::VmGuest, summary);
        self.services(ModuleId::VmGuest, summary);
    }

    fn hyperv_guest(&self, summary: &mut Summary) {
        self.packages(ModuleId::HypervGuest, summary);

        let block = ManagedBlock::new("hyperv");
        let body = profiles::HYPERV_INITRAMFS_MODULES.join("\n");
        let result = actions::apply_managed_block(self.host, Path::new(INITRAMFS_MODULES), &block, &body)
            .and_then(|outcome| {
                if outcome.changed() {
                    system::update_initramfs(self.host)?;
                }
                Ok(outcome)
            });
        step(summary, "Hyper-V initramfs modules", result);
    }

    // ------------------------------------------------------------------
    // Finalize
    // ------------------------------------------------------------------

    fn finalize(&self, summary: &mut Summary) {
        console::heading("Finishing up");
        if let Err(e) = system::update_locate_db(self.host) {
            warn_step(summary, "updatedb", &e);
        }
        if let Err(e) = Apt::new(self.host, self.settings.retry.timeout).autoremove() {
            warn_step(summary, "apt-get autoremove", &e);
        }

        let home = users::home_dir(self.host, self.username());
        let path = summary_path(&home);
        let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        match self.host.write_file(&path, summary.render(&generated_at).as_bytes(), Some(0o644)) {
            Ok(()) => {
                if let Some(username) = self.username() {
                    let chown = CommandSpec::new("chown")
                        .arg(format!("{}:", username))
                        .arg(path.display().to_string());
                    if let Err(e) = actions::run_checked(self.host, &chown, "chown summary file") {
                        warn!("{}", e);
                    }
                }
                summary.summary_file = Some(path);
            }
            Err(e) => warn_step(summary, "summary file", &e),
        }

        if self.settings.should_reboot() {
            console::info("Rebooting now");
            if let Err(e) = system::reboot(self.host) {
                warn_step(summary, "reboot", &e);
            }
        }
    }
}

pub fn summary_path(home: &Path) -> PathBuf {
    home.join(SUMMARY_FILE_NAME)
}

/// Report a configuration step's outcome; failures become summary warnings.
fn step(summary: &mut Summary, label: &str, result: Result<ActionOutcome>) {
    match result {
        Ok(outcome) => report_outcome(label, &outcome),
        Err(e) => warn_step(summary, label, &e),
    }
}

fn report_outcome(label: &str, outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::Changed => console::success(&format!("{}: configured", label)),
        ActionOutcome::Unchanged => console::info(&format!("{}: already configured", label)),
        ActionOutcome::Skipped(reason) => console::info(&format!("{}: skipped ({})", label, reason)),
        ActionOutcome::RolledBack(reason) => console::warning(&format!("{}: rolled back ({})", label, reason)),
    }
}

fn warn_step(summary: &mut Summary, label: &str, error: &ProvisionError) {
    let message = format!("{}: {}", label, error);
    console::warning(&message);
    summary.warn(message);
}

fn report_records(records: &[PackageRecord]) {
    let count = |status: PackageStatus| records.iter().filter(|r| r.status == status).count();
    let (installed, present, failed) = (
        count(PackageStatus::Installed),
        count(PackageStatus::AlreadyPresent),
        count(PackageStatus::Failed),
    );
    if failed > 0 {
        console::warning(&format!(
            "packages: {} installed, {} already present, {} failed",
            installed, present, failed
        ));
    } else {
        console::info(&format!("packages: {} installed, {} already present", installed, present));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_path() {
        assert_eq!(
            summary_path(Path::new("/home/ada")),
            PathBuf::from("/home/ada/ubuntu-setup-summary.txt")
        );
    }
}
