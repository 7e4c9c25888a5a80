//! Module State Machine
//!
//! Each selected module moves strictly forward:
//!
//! ```text
//! NotStarted
//!     ↓
//! Running
//!     ↓
//! Completed
//! ```
//!
//! A module is never resumed; a second run starts from `NotStarted` and
//! repeats every idempotency check. Completion means "every step was
//! attempted", not "every package installed".

use crate::types::ModuleId;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModuleStage {
    #[default]
    NotStarted,
    Running,
    Completed,
}

impl ModuleStage {
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Running),
            Self::Running => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ModuleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during module state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleTransitionError {
    #[error("Module {module} cannot go from {from} to {to}")]
    Invalid {
        module: ModuleId,
        from: ModuleStage,
        to: ModuleStage,
    },

    #[error("Module {module} already completed")]
    AlreadyCompleted { module: ModuleId },
}

/// Tracks the stage of every module touched during one run.
#[derive(Debug, Clone, Default)]
pub struct ModuleTracker {
    stages: BTreeMap<ModuleId, ModuleStage>,
    /// (module, stage entered, unix timestamp)
    history: Vec<(ModuleId, ModuleStage, i64)>,
}

impl ModuleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, module: ModuleId) -> ModuleStage {
        self.stages.get(&module).copied().unwrap_or_default()
    }

    pub fn start(&mut self, module: ModuleId) -> Result<(), ModuleTransitionError> {
        self.transition(module, ModuleStage::Running)
    }

    pub fn complete(&mut self, module: ModuleId) -> Result<(), ModuleTransitionError> {
        self.transition(module, ModuleStage::Completed)
    }

    pub fn history(&self) -> &[(ModuleId, ModuleStage, i64)] {
        &self.history
    }

    /// Modules that reached `Completed`, in canonical order
    pub fn completed(&self) -> Vec<ModuleId> {
        self.stages
            .iter()
            .filter(|(_, stage)| **stage == ModuleStage::Completed)
            .map(|(module, _)| *module)
            .collect()
    }

    fn transition(&mut self, module: ModuleId, to: ModuleStage) -> Result<(), ModuleTransitionError> {
        let from = self.stage(module);
        if from == ModuleStage::Completed {
            return Err(ModuleTransitionError::AlreadyCompleted { module });
        }
        if from.next() != Some(to) {
            return Err(ModuleTransitionError::Invalid { module, from, to });
        }

        let timestamp = chrono::Utc::now().timestamp();
        self.stages.insert(module, to);
        self.history.push((module, to, timestamp));
        tracing::debug!(module = %module, "module {} -> {}", from, to);
        Ok(())
    }
}
