//! OpenSSH server hardening through a drop-in fragment.
//!
//! sshd keeps the first value it reads for a keyword and includes
//! `sshd_config.d/*.conf` in lexical order, so the fragment is named to sort
//! first. The effective values are still checked with `sshd -T` afterwards.

use super::system::{SystemctlAction, systemctl};
use super::{ActionOutcome, apply_guarded_file, query};
use crate::command::CommandSpec;
use crate::documents::SshdConfig;
use crate::error::{ProvisionError, Result};
use crate::host::Host;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const SSH_DROP_IN: &str = "/etc/ssh/sshd_config.d/00-hardening.conf";

pub const CIPHERS: &str = "chacha20-poly1305@openssh.com,aes256-gcm@openssh.com,aes128-gcm@openssh.com";

/// Directives merged into the drop-in. `AllowUsers` only when a user is known.
pub fn hardening_directives(username: Option<&str>) -> Vec<(&'static str, String)> {
    let mut directives = vec![
        ("PasswordAuthentication", "no".to_string()),
        ("PermitRootLogin", "no".to_string()),
        ("PubkeyAuthentication", "yes".to_string()),
        ("KbdInteractiveAuthentication", "no".to_string()),
        ("X11Forwarding", "no".to_string()),
        ("MaxAuthTries", "3".to_string()),
    ];
    if let Some(user) = username {
        directives.push(("AllowUsers", user.to_string()));
    }
    directives.push(("Ciphers", CIPHERS.to_string()));
    directives
}

/// Directives compared against `sshd -T` after the fragment is in place.
const VERIFIED: &[&str] = &[
    "PasswordAuthentication",
    "PermitRootLogin",
    "PubkeyAuthentication",
    "KbdInteractiveAuthentication",
    "X11Forwarding",
    "MaxAuthTries",
];

/// Merge the hardening directives, validate with `sshd -t` and reload `ssh`
/// only if the fragment changed.
///
/// Returns a validation error when another configuration file still wins
/// over one of our directives.
pub fn harden_ssh(host: &dyn Host, username: Option<&str>) -> Result<ActionOutcome> {
    let path = Path::new(SSH_DROP_IN);
    let mut doc = match host.read_to_string(path)? {
        Some(text) => SshdConfig::parse(&text),
        None => SshdConfig::with_header("Managed by ubuntu-setup"),
    };
    doc.apply(&hardening_directives(username));

    let validate = CommandSpec::new("sshd").arg("-t");
    let outcome = apply_guarded_file(host, path, doc.to_string().as_bytes(), Some(0o644), &validate)?;

    if outcome.changed() {
        systemctl(host, SystemctlAction::Reload, "ssh")?;
        info!("sshd hardening applied");
    }
    if !matches!(outcome, ActionOutcome::RolledBack(_)) {
        verify_effective(host, username)?;
    }
    Ok(outcome)
}

/// Compare `sshd -T` output with what we asked for. Keywords missing from the
/// output (dry-run, old sshd) are not checked.
fn verify_effective(host: &dyn Host, username: Option<&str>) -> Result<()> {
    let Some(dump) = query(host, &CommandSpec::new("sshd").arg("-T")) else {
        debug!("sshd -T unavailable; effective configuration not verified");
        return Ok(());
    };
    let effective = parse_effective(&dump);

    let overridden: Vec<String> = hardening_directives(username)
        .into_iter()
        .filter(|(key, _)| VERIFIED.contains(key))
        .filter_map(|(key, wanted)| {
            let actual = effective.get(&key.to_ascii_lowercase())?;
            (!actual.eq_ignore_ascii_case(&wanted)).then(|| format!("{} is {} (wanted {})", key, actual, wanted))
        })
        .collect();

    if overridden.is_empty() {
        return Ok(());
    }
    Err(ProvisionError::validation(format!(
        "an earlier sshd configuration file overrides {}: {}",
        SSH_DROP_IN,
        overridden.join(", ")
    )))
}

/// `sshd -T` prints one lowercase `keyword value` pair per line.
fn parse_effective(dump: &str) -> HashMap<String, String> {
    dump.lines()
        .filter_map(|line| line.trim().split_once(' '))
        .map(|(key, value)| (key.to_ascii_lowercase(), value.trim().to_string()))
        .collect()
}
