//! ubuntu-setup - Main entry point
//!
//! Preflight, settings resolution, sequencing and reporting, in that order.
//! Exit status is 0 once the selected modules have run and 1 on a fatal
//! precondition or unusable configuration.

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{debug, info, warn};

use ubuntu_setup::cli::Cli;
use ubuntu_setup::config_file::SetupConfig;
use ubuntu_setup::host::SystemHost;
use ubuntu_setup::process_guard::{self, ProcessGuard};
use ubuntu_setup::prompt::{NoPrompt, Prompter, TerminalPrompter};
use ubuntu_setup::settings::{self, Settings};
use ubuntu_setup::{console, logging, sanity, sequencer};

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn run(cli: Cli) -> Result<()> {
    let file = cli
        .config
        .as_ref()
        .map(|path| SetupConfig::load_from_file(path))
        .transpose()
        .context("Failed to load settings file")?;
    let overrides = cli.overrides();

    let layered = Settings::layered(&overrides, file.as_ref(), &env_var).context("Invalid settings")?;
    if !logging::init(Some(&layered.log_file)) {
        console::warning(&format!(
            "Logging to {} is unavailable; continuing without a log file",
            layered.log_file.display()
        ));
    }
    info!("ubuntu-setup {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    let _guard = ProcessGuard::new();

    let host = SystemHost::new(overrides.dry_run);
    if cli.save_config.is_none() {
        let check = sanity::verify_environment(&host);
        if !check.is_ok() {
            for line in check.report() {
                console::error(&line);
            }
            sanity::run_preflight_checks(&host)?;
        }
    }
    if host.is_dry_run() {
        console::info("Dry-run mode: commands are logged, not executed");
    }

    let mut prompter: Box<dyn Prompter> = if overrides.non_interactive {
        Box::new(NoPrompt)
    } else {
        Box::new(TerminalPrompter)
    };
    let (selection, settings) = settings::resolve(&overrides, file.as_ref(), &env_var, prompter.as_mut())?;
    debug!(modules = selection.len(), "selection resolved");

    if let Some(path) = cli.save_config {
        settings
            .to_config(&selection)
            .save_to_file(&path)
            .with_context(|| format!("Failed to save settings to {:?}", path))?;
        console::success(&format!("Settings saved to {}", path.display()));
        return Ok(());
    }

    let summary = sequencer::run(&selection, &settings, &host)?;
    console::summary(&summary);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            console::error(&format!("{:#}", e));
            ExitCode::from(1)
        }
    }
}
