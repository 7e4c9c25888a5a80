//! ufw firewall rules.

use super::{ActionOutcome, query, run_checked};
use crate::command::{CommandArgs, CommandSpec};
use crate::error::Result;
use crate::host::Host;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// `ufw allow <rule>`
#[derive(Debug, Clone)]
pub struct UfwAllowArgs {
    pub rule: String,
}

impl CommandArgs for UfwAllowArgs {
    fn program(&self) -> &'static str {
        "ufw"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["allow".to_string(), self.rule.clone()]
    }
}

/// Snapshot of `ufw status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UfwStatus {
    pub active: bool,
    /// `To` column of every ALLOW rule, IPv6 duplicates folded in
    pub allowed: BTreeSet<String>,
}

/// Parse the output of `ufw status`.
///
/// ```text
/// Status: active
///
/// To                         Action      From
/// --                         ------      ----
/// 22/tcp                     ALLOW       Anywhere
/// 22/tcp (v6)                ALLOW       Anywhere (v6)
/// ```
pub fn parse_ufw_status(stdout: &str) -> UfwStatus {
    let mut status = UfwStatus::default();
    let mut in_rules = false;
    for line in stdout.lines() {
        let trimmed = line.trim();
        if let Some(state) = trimmed.strip_prefix("Status:") {
            status.active = state.trim() == "active";
            continue;
        }
        if trimmed.starts_with("--") {
            in_rules = true;
            continue;
        }
        if !in_rules || trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = trimmed
            .split_whitespace()
            .filter(|field| *field != "(v6)")
            .collect();
        if let [to, action, ..] = fields.as_slice() {
            if action.starts_with("ALLOW") {
                status.allowed.insert((*to).to_string());
            }
        }
    }
    status
}

/// Ports opened for the selection: SSH always, HTTP(S) with the server module.
pub fn firewall_ports(server_selected: bool) -> Vec<&'static str> {
    let mut ports = vec!["22/tcp"];
    if server_selected {
        ports.extend(["80/tcp", "443/tcp"]);
    }
    ports
}

pub fn configure_firewall(host: &dyn Host, ports: &[&str]) -> Result<ActionOutcome> {
    let status_cmd = CommandSpec::new("ufw").arg("status").read_only();
    let status = query(host, &status_cmd)
        .map(|out| parse_ufw_status(&out))
        .unwrap_or_default();

    run_checked(
        host,
        &CommandSpec::new("ufw").args(["default", "deny", "incoming"]),
        "ufw default deny incoming",
    )?;
    run_checked(
        host,
        &CommandSpec::new("ufw").args(["default", "allow", "outgoing"]),
        "ufw default allow outgoing",
    )?;

    let mut outcome = ActionOutcome::Unchanged;
    for port in ports {
        if status.allowed.contains(*port) {
            debug!("ufw rule {} already present", port);
            continue;
        }
        let args = UfwAllowArgs {
            rule: (*port).to_string(),
        };
        run_checked(host, &args.to_command(), &format!("ufw allow {}", port))?;
        outcome = ActionOutcome::Changed;
    }

    if !status.active {
        run_checked(host, &CommandSpec::new("ufw").args(["--force", "enable"]), "ufw enable")?;
        info!("firewall enabled");
        outcome = ActionOutcome::Changed;
    }
    Ok(outcome)
}
