//! Batch installer behaviour against an in-memory host.

mod common;

use std::path::Path;
use std::time::Duration;

use common::FakeHost;
use ubuntu_setup::command::{CommandOutput, CommandSpec};
use ubuntu_setup::error::Result;
use ubuntu_setup::host::Host;
use ubuntu_setup::installer::{BatchInstaller, BatchKind, RetryPolicy};
use ubuntu_setup::summary::Summary;
use ubuntu_setup::types::{ModuleId, PackageStatus};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn policy(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        delay: Duration::from_secs(2),
        timeout: Duration::from_secs(60),
    }
}

#[test]
fn test_installed_packages_never_reach_apt() {
    let host = FakeHost::ubuntu();
    let installer = BatchInstaller::new(&host, policy(3), false);
    let mut summary = Summary::new();

    let records = installer.install(
        ModuleId::Core,
        &names(&["curl", "jq", "git", "tmux", "jq"]),
        BatchKind::Required,
        &mut summary,
    );

    assert_eq!(records.len(), 4, "duplicates collapse into one record");
    assert_eq!(host.apt_installs(), vec![names(&["jq", "tmux"])]);
    assert_eq!(summary.already_present, names(&["curl", "git"]));
    assert_eq!(summary.installed, names(&["jq", "tmux"]));
    assert!(records.iter().all(|r| r.status.is_final()));
    assert_eq!(host.count("apt-get", &["update"]), 1);

    // The index is refreshed once per installer, not per batch.
    installer.install(ModuleId::Core, &names(&["zip"]), BatchKind::Required, &mut summary);
    assert_eq!(host.count("apt-get", &["update"]), 1);
}

#[test]
fn test_all_present_makes_no_install_call() {
    let host = FakeHost::ubuntu();
    let installer = BatchInstaller::new(&host, policy(3), false);
    let mut summary = Summary::new();

    installer.install(ModuleId::Core, &names(&["curl", "git"]), BatchKind::Required, &mut summary);
    assert!(host.apt_installs().is_empty());
    assert!(summary.installed.is_empty());
}

#[test]
fn test_retries_exhausted_marks_whole_batch_failed() {
    let host = FakeHost::ubuntu();
    host.state.borrow_mut().broken_packages.insert("nosuchpkg".to_string());
    let installer = BatchInstaller::new(&host, policy(4), false);
    let mut summary = Summary::new();

    let records = installer.install(
        ModuleId::Server,
        &names(&["nginx", "nosuchpkg", "curl"]),
        BatchKind::Required,
        &mut summary,
    );

    assert_eq!(host.apt_installs().len(), 4);
    assert_eq!(host.state.borrow().sleeps, vec![Duration::from_secs(2); 3]);
    for record in records.iter().filter(|r| r.name != "curl") {
        assert_eq!(record.status, PackageStatus::Failed);
        assert_eq!(record.attempts, 4);
    }
    assert_eq!(summary.failed, names(&["nginx", "nosuchpkg"]));
    assert_eq!(summary.already_present, names(&["curl"]));
}

/// Host whose broken packages are fixed during the first retry delay.
struct HealingHost<'a>(&'a FakeHost);

impl Host for HealingHost<'_> {
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        self.0.run(cmd)
    }

    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        self.0.read_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
        self.0.write_file(path, contents, mode)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.0.remove_file(path)
    }

    fn is_elevated(&self) -> bool {
        self.0.is_elevated()
    }

    fn sleep(&self, duration: Duration) {
        self.0.sleep(duration);
        self.0.state.borrow_mut().broken_packages.clear();
    }
}

#[test]
fn test_transient_failure_recovers_on_retry() {
    let host = FakeHost::ubuntu();
    host.state.borrow_mut().broken_packages.insert("flaky".to_string());
    let healing = HealingHost(&host);
    let installer = BatchInstaller::new(&healing, policy(3), false);
    let mut summary = Summary::new();

    let records = installer.install(ModuleId::Core, &names(&["flaky"]), BatchKind::Required, &mut summary);

    assert_eq!(records[0].status, PackageStatus::Installed);
    assert_eq!(records[0].attempts, 2);
    assert_eq!(host.apt_installs().len(), 2);
    assert!(summary.failed.is_empty());
}

#[test]
fn test_isolation_pins_failure_on_culprit() {
    let host = FakeHost::ubuntu();
    host.state.borrow_mut().broken_packages.insert("nosuchpkg".to_string());
    let installer = BatchInstaller::new(&host, policy(2), true);
    let mut summary = Summary::new();

    let records = installer.install(
        ModuleId::Core,
        &names(&["jq", "nosuchpkg", "tmux"]),
        BatchKind::Required,
        &mut summary,
    );

    // Two batch attempts, then one individual attempt per package.
    let installs = host.apt_installs();
    assert_eq!(installs.len(), 5);
    assert_eq!(&installs[2..], &[names(&["jq"]), names(&["nosuchpkg"]), names(&["tmux"])]);

    assert_eq!(summary.failed, names(&["nosuchpkg"]));
    assert_eq!(summary.installed, names(&["jq", "tmux"]));
    let culprit = records.iter().find(|r| r.name == "nosuchpkg").unwrap();
    assert_eq!(culprit.attempts, 3);
}

#[test]
fn test_optional_failures_are_warnings() {
    let host = FakeHost::ubuntu();
    host.state.borrow_mut().broken_packages.insert("lynis".to_string());
    let installer = BatchInstaller::new(&host, policy(1), false);
    let mut summary = Summary::new();

    installer.install(
        ModuleId::Security,
        &names(&["rkhunter", "lynis"]),
        BatchKind::Optional,
        &mut summary,
    );

    assert!(summary.failed.is_empty());
    assert_eq!(summary.warnings.len(), 2);
    assert!(summary.warnings[0].contains("rkhunter"));
    assert!(host.state.borrow().sleeps.is_empty());
}
