//! ubuntu-setup library
//!
//! Idempotent provisioning sequencer for Ubuntu machines. The binary wires
//! the CLI, logging and prompts around `sequencer::run`; everything with a
//! side effect goes through the `host::Host` trait.

pub mod actions;
pub mod cli;
pub mod command;
pub mod command_runner;
pub mod config_file;
pub mod console;
pub mod documents;
pub mod error;
pub mod host;
pub mod installer;
pub mod logging;
pub mod module_state;
pub mod package_manager;
pub mod process_guard;
pub mod profiles;
pub mod prompt;
pub mod sanity;
pub mod selection;
pub mod sequencer;
pub mod settings;
pub mod summary;
pub mod types;

// Re-export main types for convenience
pub use actions::ActionOutcome;
pub use command::{CommandArgs, CommandOutput, CommandSpec};
pub use command_runner::run_command_safe;
pub use config_file::SetupConfig;
pub use error::{ProvisionError, Result};
pub use host::{Host, SystemHost};
pub use installer::{BatchInstaller, BatchKind, RetryPolicy};
pub use module_state::{ModuleStage, ModuleTracker, ModuleTransitionError};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use prompt::{NoPrompt, Prompter, ScriptedPrompter, TerminalPrompter};
pub use selection::Selection;
pub use settings::{CliOverrides, Settings};
pub use summary::{PackageRecord, Summary};
pub use types::{ModuleId, PackageStatus, Toggle};
