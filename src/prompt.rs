//! Interactive prompts.
//!
//! Prompting happens only during settings resolution, before any
//! provisioning step runs. `None` from a prompter means "no answer", which
//! leaves the value unset.

use crate::error::{ProvisionError, Result};
use inquire::error::InquireError;
use inquire::{Confirm, Text};
use std::collections::VecDeque;

pub trait Prompter {
    /// Free-text question. Empty answers are returned as `None`.
    fn text(&mut self, message: &str) -> Result<Option<String>>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<Option<bool>>;

    /// Show informational lines (the module menu) before a question.
    fn show(&mut self, _lines: &[String]) {}
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

fn prompt_error(e: InquireError) -> ProvisionError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            ProvisionError::prompt("cancelled by user")
        }
        InquireError::NotTTY => ProvisionError::prompt("no terminal available for prompting"),
        other => ProvisionError::prompt(other.to_string()),
    }
}

impl Prompter for TerminalPrompter {
    fn text(&mut self, message: &str) -> Result<Option<String>> {
        let answer = Text::new(message).prompt().map_err(prompt_error)?;
        let answer = answer.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<Option<bool>> {
        let answer = Confirm::new(message)
            .with_default(default)
            .prompt()
            .map_err(prompt_error)?;
        Ok(Some(answer))
    }

    fn show(&mut self, lines: &[String]) {
        for line in lines {
            println!("{}", line);
        }
    }
}

/// Never asks anything (`--non-interactive`).
#[derive(Debug, Default)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn text(&mut self, _message: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn confirm(&mut self, _message: &str, _default: bool) -> Result<Option<bool>> {
        Ok(None)
    }
}

/// Answers from a fixed script, recording every question asked.
///
/// Text answers and confirmations are consumed in order from separate
/// queues; an exhausted queue answers `None`.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    texts: VecDeque<String>,
    confirms: VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, answer: impl Into<String>) -> Self {
        self.texts.push_back(answer.into());
        self
    }

    pub fn with_confirm(mut self, answer: bool) -> Self {
        self.confirms.push_back(answer);
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, message: &str) -> Result<Option<String>> {
        self.asked.push(message.to_string());
        Ok(self
            .texts
            .pop_front()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()))
    }

    fn confirm(&mut self, message: &str, _default: bool) -> Result<Option<bool>> {
        self.asked.push(message.to_string());
        Ok(self.confirms.pop_front())
    }
}
