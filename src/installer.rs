//! Idempotent batch package installer
//!
//! # Algorithm
//!
//! 1. Refresh the package index once per run (best-effort).
//! 2. Query each package; installed ones are `AlreadyPresent` and are never
//!    passed to an install call.
//! 3. Install the remainder in one batch call, bounded by a timeout, with up
//!    to `attempts` tries and a fixed delay in between.
//! 4. A batch that never succeeds marks every package in it `Failed`. With
//!    `isolate_failures` each of those packages then gets one individual
//!    attempt so only the culprit stays failed.
//!
//! # Failure Policy
//!
//! Nothing here returns an error. Failures end up in the records and in the
//! `Summary`; the sequencer moves on to the next module regardless.

use crate::host::Host;
use crate::package_manager::Apt;
use crate::summary::{PackageRecord, Summary};
use crate::types::{ModuleId, PackageStatus};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::Duration;
use tracing::{info, warn};

/// Bounds for a single batch install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
    /// Upper bound for one package-manager call
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Whether failures of a batch count as package failures or only warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Failures go to the summary's `failed` list
    Required,
    /// Best-effort tools (scanners, fonts); failures are warnings
    Optional,
}

pub struct BatchInstaller<'a> {
    apt: Apt<'a>,
    host: &'a dyn Host,
    policy: RetryPolicy,
    isolate_failures: bool,
    index_refreshed: Cell<bool>,
}

impl<'a> BatchInstaller<'a> {
    pub fn new(host: &'a dyn Host, policy: RetryPolicy, isolate_failures: bool) -> Self {
        Self {
            apt: Apt::new(host, policy.timeout),
            host,
            policy,
            isolate_failures,
            index_refreshed: Cell::new(false),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Install a module's package list and file the outcomes into `summary`.
    pub fn install(
        &self,
        module: ModuleId,
        packages: &[String],
        kind: BatchKind,
        summary: &mut Summary,
    ) -> Vec<PackageRecord> {
        let mut records: Vec<PackageRecord> = Vec::with_capacity(packages.len());
        for name in packages {
            if !records.iter().any(|r| &r.name == name) {
                records.push(PackageRecord::pending(name.clone(), module));
            }
        }
        if records.is_empty() {
            return records;
        }

        self.refresh_index_once(summary);

        for record in records.iter_mut() {
            if self.apt.is_installed(&record.name) {
                record.status = PackageStatus::AlreadyPresent;
            }
        }

        let pending: Vec<String> = records
            .iter()
            .filter(|r| r.status == PackageStatus::Pending)
            .map(|r| r.name.clone())
            .collect();

        if !pending.is_empty() {
            info!(module = %module, count = pending.len(), "installing packages: {}", pending.join(" "));
            let (success, attempts) = self.install_with_retry(&pending);
            for record in records.iter_mut().filter(|r| r.status == PackageStatus::Pending) {
                record.attempts = attempts;
                record.status = if success {
                    PackageStatus::Installed
                } else {
                    PackageStatus::Failed
                };
            }

            if !success && self.isolate_failures && pending.len() > 1 {
                self.isolate(&mut records);
            }
        }

        for record in &records {
            match (kind, record.status) {
                (BatchKind::Optional, PackageStatus::Failed) => {
                    summary.warn(format!("optional package {} could not be installed", record.name));
                }
                _ => summary.record(record),
            }
        }

        records
    }

    fn refresh_index_once(&self, summary: &mut Summary) {
        if self.index_refreshed.replace(true) {
            return;
        }
        if let Err(e) = self.apt.refresh_index() {
            warn!("package index refresh failed: {}", e);
            summary.warn(format!("package index refresh failed: {}", e));
        }
    }

    /// Returns (success, attempts used).
    fn install_with_retry(&self, packages: &[String]) -> (bool, u32) {
        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self.apt.install(packages) {
                Ok(output) if output.success => return (true, attempt),
                Ok(output) if output.timed_out => {
                    warn!(attempt, attempts, "batch install timed out");
                }
                Ok(output) => {
                    warn!(
                        attempt,
                        attempts,
                        exit_code = ?output.exit_code,
                        "batch install failed: {}",
                        output.stderr.trim()
                    );
                }
                Err(e) => warn!(attempt, attempts, "batch install could not run: {}", e),
            }
            if attempt < attempts {
                self.host.sleep(self.policy.delay);
            }
        }
        (false, attempts)
    }

    /// One individual attempt per failed package of a failed batch.
    fn isolate(&self, records: &mut [PackageRecord]) {
        info!("retrying failed batch one package at a time");
        for record in records.iter_mut().filter(|r| r.status == PackageStatus::Failed) {
            record.attempts += 1;
            let ok = self
                .apt
                .install(std::slice::from_ref(&record.name))
                .map(|output| output.success)
                .unwrap_or(false);
            if ok {
                record.status = PackageStatus::Installed;
            } else {
                warn!("package {} failed on its own", record.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(policy.timeout, Duration::from_secs(600));
    }
}
