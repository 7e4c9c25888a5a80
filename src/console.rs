//! Colored operator-facing status lines.
//!
//! Every line is also emitted as a tracing event under the
//! `ubuntu_setup::console` target so the log file carries the same record.
//! The stderr log layer filters that target out to avoid printing twice.

use crossterm::style::Stylize;

pub const TARGET: &str = "ubuntu_setup::console";

pub fn info(message: &str) {
    println!("{} {}", "[INFO]".blue().bold(), message);
    tracing::info!(target: TARGET, "{}", message);
}

pub fn success(message: &str) {
    println!("{} {}", "[ OK ]".green().bold(), message);
    tracing::info!(target: TARGET, "OK: {}", message);
}

pub fn warning(message: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), message);
    tracing::warn!(target: TARGET, "{}", message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "[FAIL]".red().bold(), message);
    tracing::error!(target: TARGET, "{}", message);
}

/// Section banner printed when a module starts.
pub fn heading(title: &str) {
    println!();
    println!("{}", format!("==> {}", title).cyan().bold());
    tracing::info!(target: TARGET, "==> {}", title);
}

/// Final categorized report.
pub fn summary(summary: &crate::summary::Summary) {
    heading("Summary");
    for module in &summary.completed {
        println!("  {} {}", "✓".green(), module.title());
    }
    println!(
        "  installed: {}  already present: {}  failed: {}",
        summary.installed.len(),
        summary.already_present.len(),
        summary.failed.len()
    );
    if !summary.failed.is_empty() {
        error(&format!("Failed packages: {}", summary.failed.join(" ")));
    }
    if let Some(command) = summary.remediation_command() {
        info(&format!("To retry: {}", command));
    }
    for artifact in &summary.artifacts {
        info(&format!("{}: {}", artifact.label, artifact.path.display()));
    }
    for message in &summary.warnings {
        warning(message);
    }
    if let Some(ref path) = summary.summary_file {
        success(&format!("Summary written to {}", path.display()));
    }
}
