//! Tracing subscriber setup.
//!
//! Two layers, filtered independently:
//!
//! - stderr: compact, colored, `RUST_LOG` or `warn` by default; console
//!   status lines are excluded since they are already on stdout
//! - log file: appended, no ANSI, `info` and above including console lines
//!
//! A log file that cannot be opened is reported and skipped; it never stops
//! the run.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_STDERR_FILTER: &str = "warn,ubuntu_setup::console=off";

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Returns false if the log file could not be
/// opened.
pub fn init(log_file: Option<&Path>) -> bool {
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_STDERR_FILTER));
    let stderr_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let mut file_error = None;
    let file_layer = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new("info")),
        ),
        Err(e) => {
            file_error = Some(format!("cannot open log file {}: {}", path.display(), e));
            None
        }
    });

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    match file_error {
        Some(message) => {
            tracing::warn!("{}", message);
            false
        }
        None => true,
    }
}
