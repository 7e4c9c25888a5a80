//! Run summary.
//!
//! The `Summary` is accumulated by the sequencer and passed by `&mut` through
//! every module; nothing is tracked in process-wide state.

use crate::types::{ModuleId, PackageStatus};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// One package's outcome within a module batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub name: String,
    pub module: ModuleId,
    pub status: PackageStatus,
    pub attempts: u32,
}

impl PackageRecord {
    pub fn pending(name: impl Into<String>, module: ModuleId) -> Self {
        Self {
            name: name.into(),
            module,
            status: PackageStatus::Pending,
            attempts: 0,
        }
    }
}

/// A file produced by a module that the operator will want to know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub module: ModuleId,
    pub label: String,
    pub path: PathBuf,
}

/// Categorized result of a provisioning run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub installed: Vec<String>,
    pub already_present: Vec<String>,
    pub failed: Vec<String>,
    pub completed: Vec<ModuleId>,
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<String>,
    /// Where the summary file was written, if it was
    #[serde(skip)]
    pub summary_file: Option<PathBuf>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a finalized package record into its list.
    pub fn record(&mut self, record: &PackageRecord) {
        let list = match record.status {
            PackageStatus::Installed => &mut self.installed,
            PackageStatus::AlreadyPresent => &mut self.already_present,
            PackageStatus::Failed => &mut self.failed,
            PackageStatus::Pending => return,
        };
        if !list.contains(&record.name) {
            list.push(record.name.clone());
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_artifact(&mut self, module: ModuleId, label: impl Into<String>, path: PathBuf) {
        self.artifacts.push(Artifact {
            module,
            label: label.into(),
            path,
        });
    }

    pub fn mark_completed(&mut self, module: ModuleId) {
        if !self.completed.contains(&module) {
            self.completed.push(module);
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Suggested manual command to retry failed packages.
    pub fn remediation_command(&self) -> Option<String> {
        if self.failed.is_empty() {
            None
        } else {
            Some(format!("sudo apt-get install {}", self.failed.join(" ")))
        }
    }

    /// Human-readable summary file contents.
    pub fn render(&self, generated_at: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Ubuntu Setup Summary");
        let _ = writeln!(out, "Generated: {}", generated_at);
        let _ = writeln!(out);

        let _ = writeln!(out, "Completed modules:");
        if self.completed.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for module in &self.completed {
            let _ = writeln!(out, "✓ {}", module.title());
        }
        let _ = writeln!(out);

        write_list(&mut out, "Installed", &self.installed);
        write_list(&mut out, "Already present", &self.already_present);
        write_list(&mut out, "Failed", &self.failed);

        if let Some(cmd) = self.remediation_command() {
            let _ = writeln!(out, "To retry failed packages run:");
            let _ = writeln!(out, "  {}", cmd);
            let _ = writeln!(out);
        }

        if !self.artifacts.is_empty() {
            let _ = writeln!(out, "Artifacts:");
            for artifact in &self.artifacts {
                let _ = writeln!(out, "  {}: {}", artifact.label, artifact.path.display());
            }
            let _ = writeln!(out);
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "Warnings:");
            for warning in &self.warnings {
                let _ = writeln!(out, "  - {}", warning);
            }
        }

        out
    }
}

fn write_list(out: &mut String, heading: &str, items: &[String]) {
    let _ = writeln!(out, "{} ({}):", heading, items.len());
    if !items.is_empty() {
        let _ = writeln!(out, "  {}", items.join(" "));
    }
    let _ = writeln!(out);
}
