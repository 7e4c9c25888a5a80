//! Error handling module for ubuntu-setup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Only `Precondition` and `MissingInput` stop a run; every other variant is
//! recovered at the module boundary and reported as a warning.

use thiserror::Error;

/// Main error type for the provisioning sequencer
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// IO errors (file operations, process spawning)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unmet precondition (e.g. not running with elevated privileges)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Required input still missing after prompting
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// External command failed or could not be run
    #[error("Command failed: {0}")]
    Command(String),

    /// Generated configuration rejected by its validator
    #[error("Validation error: {0}")]
    Validation(String),

    /// Interactive prompt failed (no terminal, interrupted)
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Module state machine misuse
    #[error(transparent)]
    Transition(#[from] crate::module_state::ModuleTransitionError),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a missing-input error
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }

    /// Returns true if this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Precondition(_) | Self::MissingInput(_))
    }
}
