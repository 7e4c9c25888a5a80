//! Per-user developer toolchains: nvm/Node.js and pipx tools.
//!
//! Everything here runs as the provisioned user, never as root, and is
//! best-effort.

use super::release::latest_release_tag;
use super::{ActionOutcome, query, run_checked};
use crate::command::CommandSpec;
use crate::error::Result;
use crate::host::Host;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const NVM_REPO: &str = "nvm-sh/nvm";

pub const PIPX_TOOLS: &[&str] = &["poetry", "httpie"];

/// Quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Install nvm for `username` at the latest release, then the requested
/// Node.js version.
pub fn install_nvm(
    host: &dyn Host,
    username: &str,
    home: &Path,
    node_version: &str,
    timeout: Duration,
) -> Result<ActionOutcome> {
    let nvm_sh = home.join(".nvm").join("nvm.sh");
    let mut outcome = ActionOutcome::Unchanged;

    if !host.file_exists(&nvm_sh)? {
        let tag = latest_release_tag(host, NVM_REPO)?;
        info!("installing nvm {} for {}", tag, username);
        let script = format!(
            "curl -fsSL https://raw.githubusercontent.com/{}/{}/install.sh | bash",
            NVM_REPO, tag
        );
        let cmd = CommandSpec::shell(script).timeout(timeout).as_user(username);
        run_checked(host, &cmd, "nvm install script")?;
        outcome = ActionOutcome::Changed;
    }

    let script = format!(
        ". {} && nvm install {}",
        shell_quote(&nvm_sh.display().to_string()),
        shell_quote(node_version)
    );
    let cmd = CommandSpec::shell(script).timeout(timeout).as_user(username);
    let output = run_checked(host, &cmd, &format!("nvm install {}", node_version))?;
    if !output.stdout.contains("is already installed") {
        outcome = ActionOutcome::Changed;
    }
    Ok(outcome)
}

/// `pipx install` each tool the user does not have yet.
pub fn install_pipx_tools(host: &dyn Host, username: &str, tools: &[&str], timeout: Duration) -> Result<ActionOutcome> {
    let list = CommandSpec::new("pipx")
        .args(["list", "--short"])
        .read_only()
        .as_user(username);
    let installed = query(host, &list).unwrap_or_default();

    let mut outcome = ActionOutcome::Unchanged;
    for tool in tools {
        if installed
            .lines()
            .any(|line| line.split_whitespace().next() == Some(*tool))
        {
            continue;
        }
        let cmd = CommandSpec::new("pipx")
            .args(["install", tool])
            .timeout(timeout)
            .as_user(username);
        run_checked(host, &cmd, &format!("pipx install {}", tool))?;
        outcome = ActionOutcome::Changed;
    }

    if outcome.changed() {
        let ensurepath = CommandSpec::new("pipx").arg("ensurepath").as_user(username);
        run_checked(host, &ensurepath, "pipx ensurepath")?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("lts/*"), "'lts/*'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
