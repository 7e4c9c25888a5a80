//! Provisioned user account: creation, groups, home, SSH key, git identity.

use super::{ActionOutcome, query, run_checked};
use crate::command::{CommandArgs, CommandSpec};
use crate::error::{ProvisionError, Result};
use crate::host::Host;
use std::path::PathBuf;
use tracing::info;

/// `adduser --disabled-password --gecos "" <name>`
#[derive(Debug, Clone)]
pub struct AddUserArgs {
    pub username: String,
}

impl CommandArgs for AddUserArgs {
    fn program(&self) -> &'static str {
        "adduser"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "--disabled-password".to_string(),
            "--gecos".to_string(),
            String::new(),
            self.username.clone(),
        ]
    }
}

/// `usermod -aG <group> <name>`
#[derive(Debug, Clone)]
pub struct AddToGroupArgs {
    pub username: String,
    pub group: String,
}

impl CommandArgs for AddToGroupArgs {
    fn program(&self) -> &'static str {
        "usermod"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-aG".to_string(), self.group.clone(), self.username.clone()]
    }
}

/// Validate a login name: 1-32 chars, starts with a lowercase letter,
/// then lowercase letters, digits, `_` or `-`.
pub fn validate_username(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ProvisionError::config("Username must not be empty"));
    }
    if name.len() > 32 {
        return Err(ProvisionError::config("Username must be at most 32 characters long"));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(ProvisionError::config("Username must start with a lowercase letter"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(ProvisionError::config(
            "Username can only contain lowercase letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

pub fn user_exists(host: &dyn Host, username: &str) -> bool {
    let cmd = CommandSpec::new("id").args(["-u", username]).read_only();
    query(host, &cmd).is_some()
}

/// Create the user if `id -u` does not know it.
pub fn ensure_user(host: &dyn Host, username: &str) -> Result<ActionOutcome> {
    if user_exists(host, username) {
        return Ok(ActionOutcome::Unchanged);
    }
    info!("creating user {}", username);
    let args = AddUserArgs {
        username: username.to_string(),
    };
    run_checked(host, &args.to_command(), &format!("adduser {}", username))?;
    Ok(ActionOutcome::Changed)
}

pub fn ensure_group_membership(host: &dyn Host, username: &str, group: &str) -> Result<ActionOutcome> {
    let groups = CommandSpec::new("id").args(["-nG", username]).read_only();
    if query(host, &groups).is_some_and(|out| out.split_whitespace().any(|g| g == group)) {
        return Ok(ActionOutcome::Unchanged);
    }
    let args = AddToGroupArgs {
        username: username.to_string(),
        group: group.to_string(),
    };
    run_checked(host, &args.to_command(), &format!("usermod -aG {} {}", group, username))?;
    Ok(ActionOutcome::Changed)
}

/// Home directory of `username` from the passwd database.
///
/// Falls back to `/home/<name>` when the lookup fails (e.g. in dry-run mode
/// before the user exists), and to `/root` when no user is known.
pub fn home_dir(host: &dyn Host, username: Option<&str>) -> PathBuf {
    let Some(username) = username else {
        return PathBuf::from("/root");
    };
    let cmd = CommandSpec::new("getent").args(["passwd", username]).read_only();
    query(host, &cmd)
        .and_then(|line| parse_passwd_home(&line))
        .unwrap_or_else(|| PathBuf::from("/home").join(username))
}

/// Sixth field of a passwd(5) entry.
pub fn parse_passwd_home(line: &str) -> Option<PathBuf> {
    line.lines()
        .next()?
        .split(':')
        .nth(5)
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Generate an ed25519 key pair for `username` unless one exists.
///
/// Returns the outcome and the public key path either way.
pub fn ensure_ssh_key(host: &dyn Host, username: &str, home: &std::path::Path) -> Result<(ActionOutcome, PathBuf)> {
    let ssh_dir = home.join(".ssh");
    let private = ssh_dir.join("id_ed25519");
    let public = ssh_dir.join("id_ed25519.pub");
    if host.file_exists(&public)? {
        return Ok((ActionOutcome::Unchanged, public));
    }

    let mkdir = CommandSpec::new("mkdir")
        .args(["-p", "-m", "700"])
        .arg(ssh_dir.display().to_string())
        .as_user(username);
    run_checked(host, &mkdir, "create ~/.ssh")?;

    let keygen = CommandSpec::new("ssh-keygen")
        .args(["-q", "-t", "ed25519", "-N", ""])
        .arg("-C")
        .arg(format!("{}@ubuntu-setup", username))
        .arg("-f")
        .arg(private.display().to_string())
        .as_user(username);
    run_checked(host, &keygen, "ssh-keygen")?;
    info!("generated {}", public.display());
    Ok((ActionOutcome::Changed, public))
}

/// Set `git config --global user.name/user.email` for `username`.
pub fn configure_git_identity(
    host: &dyn Host,
    username: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<ActionOutcome> {
    let mut outcome = ActionOutcome::Skipped("no git identity configured".to_string());
    for (key, value) in [("user.name", name), ("user.email", email)] {
        let Some(value) = value else { continue };
        let current = CommandSpec::new("git")
            .args(["config", "--global", key])
            .read_only()
            .as_user(username);
        if query(host, &current).as_deref() == Some(value) {
            outcome = outcome.merge(ActionOutcome::Unchanged);
            continue;
        }
        let set = CommandSpec::new("git")
            .args(["config", "--global", key, value])
            .as_user(username);
        run_checked(host, &set, &format!("git config {}", key))?;
        outcome = outcome.merge(ActionOutcome::Changed);
    }
    Ok(outcome)
}
