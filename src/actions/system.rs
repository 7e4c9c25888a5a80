//! systemd, timezone and other host-wide settings.

use super::{ActionOutcome, apply_file, query, run_checked};
use crate::command::{CommandArgs, CommandSpec};
use crate::error::Result;
use crate::host::Host;
use std::path::Path;
use strum::Display;
use tracing::info;

pub const AUTO_UPGRADES_PATH: &str = "/etc/apt/apt.conf.d/20auto-upgrades";

const AUTO_UPGRADES: &str = "APT::Periodic::Update-Package-Lists \"1\";\nAPT::Periodic::Unattended-Upgrade \"1\";\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SystemctlAction {
    Enable,
    Restart,
    Reload,
    IsEnabled,
    GetDefault,
    SetDefault,
    Reboot,
}

/// `systemctl <action> [--now] [unit]`
#[derive(Debug, Clone)]
pub struct SystemctlArgs {
    pub action: SystemctlAction,
    pub unit: Option<String>,
    pub now: bool,
}

impl SystemctlArgs {
    pub fn new(action: SystemctlAction, unit: impl Into<String>) -> Self {
        Self {
            action,
            unit: Some(unit.into()),
            now: false,
        }
    }

    pub fn bare(action: SystemctlAction) -> Self {
        Self {
            action,
            unit: None,
            now: false,
        }
    }

    pub fn now(mut self) -> Self {
        self.now = true;
        self
    }
}

impl CommandArgs for SystemctlArgs {
    fn program(&self) -> &'static str {
        "systemctl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![self.action.to_string()];
        if self.now {
            args.push("--now".to_string());
        }
        if let Some(ref unit) = self.unit {
            args.push(unit.clone());
        }
        args
    }

    fn is_read_only(&self) -> bool {
        matches!(self.action, SystemctlAction::IsEnabled | SystemctlAction::GetDefault)
    }
}

/// `timedatectl set-timezone <zone>`
#[derive(Debug, Clone)]
pub struct SetTimezoneArgs {
    pub timezone: String,
}

impl CommandArgs for SetTimezoneArgs {
    fn program(&self) -> &'static str {
        "timedatectl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["set-timezone".to_string(), self.timezone.clone()]
    }
}

pub fn systemctl(host: &dyn Host, action: SystemctlAction, unit: &str) -> Result<()> {
    let args = SystemctlArgs::new(action, unit);
    run_checked(host, &args.to_command(), &format!("systemctl {} {}", action, unit))?;
    Ok(())
}

/// Enable and start a unit unless `systemctl is-enabled` already says so.
pub fn enable_service(host: &dyn Host, unit: &str) -> Result<ActionOutcome> {
    let check = SystemctlArgs::new(SystemctlAction::IsEnabled, unit).to_command();
    if query(host, &check).as_deref() == Some("enabled") {
        return Ok(ActionOutcome::Unchanged);
    }
    let enable = SystemctlArgs::new(SystemctlAction::Enable, unit).now();
    run_checked(host, &enable.to_command(), &format!("systemctl enable {}", unit))?;
    info!("enabled {}", unit);
    Ok(ActionOutcome::Changed)
}

pub fn set_timezone(host: &dyn Host, timezone: &str) -> Result<ActionOutcome> {
    let current = CommandSpec::new("timedatectl")
        .args(["show", "-p", "Timezone", "--value"])
        .read_only();
    if query(host, &current).as_deref() == Some(timezone) {
        return Ok(ActionOutcome::Unchanged);
    }
    let args = SetTimezoneArgs {
        timezone: timezone.to_string(),
    };
    run_checked(host, &args.to_command(), "timedatectl set-timezone")?;
    Ok(ActionOutcome::Changed)
}

pub fn set_default_target(host: &dyn Host, target: &str) -> Result<ActionOutcome> {
    let current = SystemctlArgs::bare(SystemctlAction::GetDefault).to_command();
    if query(host, &current).as_deref() == Some(target) {
        return Ok(ActionOutcome::Unchanged);
    }
    systemctl(host, SystemctlAction::SetDefault, target)?;
    Ok(ActionOutcome::Changed)
}

pub fn enable_unattended_upgrades(host: &dyn Host) -> Result<ActionOutcome> {
    apply_file(host, Path::new(AUTO_UPGRADES_PATH), AUTO_UPGRADES.as_bytes(), Some(0o644))
}

pub fn refresh_font_cache(host: &dyn Host) -> Result<()> {
    run_checked(host, &CommandSpec::new("fc-cache").arg("-f"), "fc-cache")?;
    Ok(())
}

pub fn update_initramfs(host: &dyn Host) -> Result<()> {
    run_checked(host, &CommandSpec::new("update-initramfs").arg("-u"), "update-initramfs")?;
    Ok(())
}

pub fn update_locate_db(host: &dyn Host) -> Result<()> {
    run_checked(host, &CommandSpec::new("updatedb"), "updatedb")?;
    Ok(())
}

pub fn reboot(host: &dyn Host) -> Result<()> {
    let args = SystemctlArgs::bare(SystemctlAction::Reboot);
    run_checked(host, &args.to_command(), "systemctl reboot")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_systemctl_args() {
        let args = SystemctlArgs::new(SystemctlAction::Enable, "docker").now();
        assert_eq!(args.to_cli_args(), vec!["enable", "--now", "docker"]);
        assert!(!args.is_read_only());

        let args = SystemctlArgs::new(SystemctlAction::IsEnabled, "docker");
        assert_eq!(args.to_cli_args(), vec!["is-enabled", "docker"]);
        assert!(args.to_command().read_only);

        assert_eq!(
            SystemctlArgs::bare(SystemctlAction::GetDefault).to_cli_args(),
            vec!["get-default"]
        );
    }

    #[test]
    fn test_auto_upgrades_contents() {
        assert!(AUTO_UPGRADES.contains("Update-Package-Lists \"1\""));
        assert!(AUTO_UPGRADES.contains("Unattended-Upgrade \"1\""));
    }
}
