//! fail2ban jail overrides in `jail.local`.

use super::ActionOutcome;
use super::system::{SystemctlAction, systemctl};
use crate::documents::IniDocument;
use crate::error::Result;
use crate::host::Host;
use std::path::Path;

pub const JAIL_LOCAL: &str = "/etc/fail2ban/jail.local";

pub const JAIL_OVERRIDES: [(&str, &str, &str); 6] = [
    ("DEFAULT", "bantime", "3600"),
    ("DEFAULT", "findtime", "600"),
    ("DEFAULT", "maxretry", "5"),
    ("sshd", "enabled", "true"),
    ("sshd", "port", "ssh"),
    ("sshd", "maxretry", "3"),
];

/// Merge the jail overrides and restart fail2ban when the file changed.
///
/// An unparsable `jail.local` is left alone and reported.
pub fn configure_fail2ban(host: &dyn Host) -> Result<ActionOutcome> {
    let path = Path::new(JAIL_LOCAL);
    let mut doc = match host.read_to_string(path)? {
        Some(text) => IniDocument::parse(&text)?,
        None => IniDocument::new(),
    };
    if !doc.apply(&JAIL_OVERRIDES) {
        return Ok(ActionOutcome::Unchanged);
    }
    host.write_file(path, doc.render().as_bytes(), Some(0o644))?;
    systemctl(host, SystemctlAction::Restart, "fail2ban")?;
    Ok(ActionOutcome::Changed)
}
