//! In-memory Ubuntu host for driving the sequencer in tests.
//!
//! Simulates just enough of dpkg, apt, user management, systemd, ufw, sshd,
//! snap and friends for every module to run. Every command is logged as it
//! was issued, `sudo -u` wrapping included.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ubuntu_setup::command::{CommandOutput, CommandSpec};
use ubuntu_setup::error::Result;
use ubuntu_setup::host::Host;

pub const BASE_CRONTAB: &str = "SHELL=/bin/sh\nPATH=/usr/local/sbin:/usr/local/bin:/sbin:/bin:/usr/sbin:/usr/bin\n\n17 *\t* * *\troot\tcd / && run-parts --report /etc/cron.hourly\n";

pub const ORIGINAL_SSH_FRAGMENT: &str = "# site policy\nPort 2222\nPasswordAuthentication yes\n";

#[derive(Debug, Default)]
pub struct FakeState {
    pub elevated: bool,
    pub installed: BTreeSet<String>,
    /// apt batches containing any of these fail
    pub broken_packages: BTreeSet<String>,
    pub apt_installs: Vec<Vec<String>>,
    pub users: BTreeMap<String, Vec<String>>,
    pub files: BTreeMap<PathBuf, Vec<u8>>,
    pub commands: Vec<CommandSpec>,
    pub enabled_services: BTreeSet<String>,
    pub ufw_active: bool,
    pub ufw_rules: Vec<String>,
    pub sshd_config_valid: bool,
    pub nginx_config_valid: bool,
    pub snaps: BTreeSet<String>,
    pub timezone: String,
    pub default_target: String,
    pub git_config: BTreeMap<(String, String), String>,
    pub sleeps: Vec<Duration>,
    /// Programs that fail whatever their arguments
    pub failing_programs: BTreeSet<String>,
    pub rebooted: bool,
}

pub struct FakeHost {
    pub state: RefCell<FakeState>,
}

fn package_args(args: &[String]) -> Vec<String> {
    let mut packages = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "-o" {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') {
            packages.push(arg.clone());
        }
    }
    packages
}

/// What `sshd -T` would print: drop-ins in lexical order, then the main
/// file, first value of each keyword wins.
fn effective_sshd(files: &BTreeMap<PathBuf, Vec<u8>>) -> String {
    let drop_ins = files
        .iter()
        .filter(|(path, _)| {
            path.parent() == Some(Path::new("/etc/ssh/sshd_config.d"))
                && path.extension().is_some_and(|ext| ext == "conf")
        })
        .map(|(_, bytes)| bytes);
    let main = files.get(Path::new("/etc/ssh/sshd_config"));

    let mut effective: BTreeMap<String, String> = BTreeMap::new();
    for bytes in drop_ins.chain(main) {
        for line in String::from_utf8_lossy(bytes).lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let key = key.to_ascii_lowercase();
            if key == "match" {
                break;
            }
            if key != "include" {
                effective.entry(key).or_insert_with(|| value.trim().to_string());
            }
        }
    }
    effective
        .iter()
        .map(|(key, value)| format!("{} {}\n", key, value))
        .collect()
}

impl FakeHost {
    /// A freshly installed Ubuntu server: root, a few base packages, the
    /// stock crontab, no extra users.
    pub fn ubuntu() -> Self {
        let mut state = FakeState {
            elevated: true,
            sshd_config_valid: true,
            nginx_config_valid: true,
            timezone: "Etc/UTC".to_string(),
            default_target: "multi-user.target".to_string(),
            ..FakeState::default()
        };
        for package in ["curl", "git", "ca-certificates", "openssh-server"] {
            state.installed.insert(package.to_string());
        }
        state
            .files
            .insert(PathBuf::from("/etc/crontab"), BASE_CRONTAB.as_bytes().to_vec());
        state.files.insert(
            PathBuf::from("/etc/ssh/sshd_config"),
            b"Include /etc/ssh/sshd_config.d/*.conf\nKbdInteractiveAuthentication no\n".to_vec(),
        );
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn not_root() -> Self {
        let host = Self::ubuntu();
        host.state.borrow_mut().elevated = false;
        host
    }

    pub fn with_user(self, name: &str) -> Self {
        self.state
            .borrow_mut()
            .users
            .insert(name.to_string(), vec![name.to_string()]);
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state
            .borrow()
            .files
            .get(Path::new(path))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn put_file(&self, path: &str, contents: &str) {
        self.state
            .borrow_mut()
            .files
            .insert(PathBuf::from(path), contents.as_bytes().to_vec());
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.state.borrow().commands.clone()
    }

    /// Number of logged commands of `program` whose arguments start with `args`.
    pub fn count(&self, program: &str, args: &[&str]) -> usize {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|cmd| cmd.matches(program, args))
            .count()
    }

    pub fn apt_installs(&self) -> Vec<Vec<String>> {
        self.state.borrow().apt_installs.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.commands.clear();
        state.apt_installs.clear();
    }

    fn simulate(&self, program: &str, args: &[String], user: Option<&str>) -> CommandOutput {
        let mut state = self.state.borrow_mut();
        if state.failing_programs.contains(program) {
            return CommandOutput::failed(1, format!("{}: simulated failure", program));
        }
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("");

        match program {
            "dpkg-query" => {
                let package = args.last().cloned().unwrap_or_default();
                if state.installed.contains(&package) {
                    CommandOutput::ok("install ok installed")
                } else {
                    CommandOutput::failed(1, format!("dpkg-query: no packages found matching {}", package))
                }
            }
            "apt-get" => match arg(0) {
                "install" => {
                    let packages = package_args(args);
                    state.apt_installs.push(packages.clone());
                    if let Some(bad) = packages.iter().find(|p| state.broken_packages.contains(*p)) {
                        return CommandOutput::failed(100, format!("E: Unable to locate package {}", bad));
                    }
                    state.installed.extend(packages);
                    CommandOutput::ok("")
                }
                _ => CommandOutput::ok(""),
            },
            "id" => {
                let name = arg(1);
                match (arg(0), state.users.get(name)) {
                    ("-u", Some(_)) => CommandOutput::ok("1000\n"),
                    ("-nG", Some(groups)) => CommandOutput::ok(format!("{}\n", groups.join(" "))),
                    _ => CommandOutput::failed(1, format!("id: '{}': no such user", name)),
                }
            }
            "adduser" => {
                let name = args.last().cloned().unwrap_or_default();
                state.users.insert(name.clone(), vec![name]);
                CommandOutput::ok("")
            }
            "usermod" => {
                let (group, name) = (arg(1).to_string(), arg(2).to_string());
                match state.users.get_mut(&name) {
                    Some(groups) => {
                        if !groups.contains(&group) {
                            groups.push(group);
                        }
                        CommandOutput::ok("")
                    }
                    None => CommandOutput::failed(6, format!("usermod: user '{}' does not exist", name)),
                }
            }
            "getent" => {
                let name = arg(1);
                if state.users.contains_key(name) {
                    CommandOutput::ok(format!("{0}:x:1000:1000:,,,:/home/{0}:/bin/bash\n", name))
                } else {
                    CommandOutput::failed(2, "")
                }
            }
            "timedatectl" => match arg(0) {
                "show" => CommandOutput::ok(format!("{}\n", state.timezone)),
                "set-timezone" => {
                    state.timezone = arg(1).to_string();
                    CommandOutput::ok("")
                }
                _ => CommandOutput::ok(""),
            },
            "systemctl" => match arg(0) {
                "is-enabled" => {
                    if state.enabled_services.contains(arg(1)) {
                        CommandOutput::ok("enabled\n")
                    } else {
                        CommandOutput::failed(1, "disabled")
                    }
                }
                "enable" => {
                    let unit = args.last().cloned().unwrap_or_default();
                    state.enabled_services.insert(unit);
                    CommandOutput::ok("")
                }
                "get-default" => CommandOutput::ok(format!("{}\n", state.default_target)),
                "set-default" => {
                    state.default_target = arg(1).to_string();
                    CommandOutput::ok("")
                }
                "reboot" => {
                    state.rebooted = true;
                    CommandOutput::ok("")
                }
                _ => CommandOutput::ok(""),
            },
            "ufw" => match arg(0) {
                "status" => {
                    let mut out = format!(
                        "Status: {}\n",
                        if state.ufw_active { "active" } else { "inactive" }
                    );
                    if state.ufw_active {
                        out.push_str("\nTo                         Action      From\n");
                        out.push_str("--                         ------      ----\n");
                        for rule in &state.ufw_rules {
                            out.push_str(&format!("{:<27}ALLOW       Anywhere\n", rule));
                        }
                        for rule in &state.ufw_rules {
                            out.push_str(&format!("{:<27}ALLOW       Anywhere (v6)\n", format!("{} (v6)", rule)));
                        }
                    }
                    CommandOutput::ok(out)
                }
                "allow" => {
                    state.ufw_rules.push(arg(1).to_string());
                    CommandOutput::ok("Rule added\n")
                }
                "--force" => {
                    state.ufw_active = true;
                    CommandOutput::ok("Firewall is active and enabled on system startup\n")
                }
                _ => CommandOutput::ok(""),
            },
            "sshd" if arg(0) == "-T" => CommandOutput::ok(effective_sshd(&state.files)),
            "sshd" => {
                if state.sshd_config_valid {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(255, "/etc/ssh/sshd_config.d/00-hardening.conf: Bad configuration option")
                }
            }
            "nginx" => {
                if state.nginx_config_valid {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(1, "nginx: configuration file test failed")
                }
            }
            "snap" => match arg(0) {
                "list" => {
                    if state.snaps.contains(arg(1)) {
                        CommandOutput::ok(format!("Name Version\n{} 1.0\n", arg(1)))
                    } else {
                        CommandOutput::failed(1, "error: no matching snaps installed")
                    }
                }
                "install" => {
                    state.snaps.insert(arg(1).to_string());
                    CommandOutput::ok("")
                }
                _ => CommandOutput::ok(""),
            },
            "ssh-keygen" => {
                let private = args
                    .iter()
                    .position(|a| a == "-f")
                    .and_then(|i| args.get(i + 1))
                    .cloned()
                    .unwrap_or_default();
                state.files.insert(PathBuf::from(&private), b"PRIVATE".to_vec());
                state.files.insert(
                    PathBuf::from(format!("{}.pub", private)),
                    b"ssh-ed25519 AAAA test".to_vec(),
                );
                CommandOutput::ok("")
            }
            "git" => {
                let user = user.unwrap_or("root").to_string();
                match args.len() {
                    3 => match state.git_config.get(&(user, arg(2).to_string())) {
                        Some(value) => CommandOutput::ok(format!("{}\n", value)),
                        None => CommandOutput::failed(1, ""),
                    },
                    _ => {
                        state
                            .git_config
                            .insert((user, arg(2).to_string()), arg(3).to_string());
                        CommandOutput::ok("")
                    }
                }
            }
            "curl" => CommandOutput::ok(r#"{"tag_name":"v0.40.1","name":"v0.40.1"}"#),
            "bash" => {
                let script = arg(1);
                if script.contains("install.sh") {
                    let home = format!("/home/{}", user.unwrap_or("root"));
                    state
                        .files
                        .insert(PathBuf::from(format!("{}/.nvm/nvm.sh", home)), b"# nvm".to_vec());
                }
                CommandOutput::ok("")
            }
            _ => CommandOutput::ok(""),
        }
    }
}

impl Host for FakeHost {
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        self.state.borrow_mut().commands.push(cmd.clone());

        if cmd.program == "sudo" {
            let user = cmd.args.get(1).cloned();
            let split = cmd.args.iter().position(|a| a == "--").map(|i| i + 1).unwrap_or(0);
            return Ok(match cmd.args[split..].split_first() {
                Some((program, args)) => self.simulate(program, args, user.as_deref()),
                None => CommandOutput::failed(1, "sudo: no command given"),
            });
        }
        Ok(self.simulate(&cmd.program, &cmd.args, None))
    }

    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.state.borrow().files.get(path).cloned())
    }

    fn write_file(&self, path: &Path, contents: &[u8], _mode: Option<u32>) -> Result<()> {
        self.state
            .borrow_mut()
            .files
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.state.borrow_mut().files.remove(path);
        Ok(())
    }

    fn is_elevated(&self) -> bool {
        self.state.borrow().elevated
    }

    fn sleep(&self, duration: Duration) {
        self.state.borrow_mut().sleeps.push(duration);
    }
}
