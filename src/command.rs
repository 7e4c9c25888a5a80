//! Type-safe command contracts.
//!
//! Every external program the sequencer invokes is described by a
//! `CommandSpec`. Typed argument structs implement `CommandArgs` so the
//! compiler, not a string vector, owns the mapping between a Rust struct and
//! the program's flags.
//!
//! # Design Goals
//!
//! 1. **Single Source of Truth**: The struct definition IS the contract.
//! 2. **Dry-run awareness**: Query commands are marked `read_only` and keep
//!    running in dry-run mode so the preview stays realistic.
//! 3. **Bounded**: A command may carry a timeout; the runner kills the whole
//!    process group when it expires.

use crate::error::{ProvisionError, Result};
use std::fmt;
use std::time::Duration;

/// Description of one external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Query-only commands that never mutate the host
    pub read_only: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: None,
            read_only: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Re-target the command to run as `user` with that user's HOME.
    pub fn as_user(self, user: &str) -> Self {
        let mut args = vec![
            "-u".to_string(),
            user.to_string(),
            "-H".to_string(),
            "--".to_string(),
            self.program,
        ];
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            env: self.env,
            timeout: self.timeout,
            read_only: self.read_only,
        }
    }

    /// Run a bash snippet (`bash -c <script>`).
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("bash").arg("-c").arg(script)
    }

    /// Returns true if this is `program` with `args` as a prefix of its arguments.
    pub fn matches(&self, program: &str, args: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= args.len()
            && self.args.iter().zip(args).all(|(a, b)| a == b)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Output from a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// Whether the runner killed the command after its timeout.
    pub timed_out: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            success: true,
            ..Self::default()
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(code),
            ..Self::default()
        }
    }

    /// Output of a command killed after exceeding its timeout.
    pub fn timed_out(stdout: String, stderr: String) -> Self {
        Self {
            stdout,
            stderr,
            exit_code: None,
            success: false,
            timed_out: true,
        }
    }

    /// Check if the command succeeded and return an error if not.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            return Ok(());
        }
        if self.timed_out {
            return Err(ProvisionError::command(format!("{} timed out", context)));
        }
        Err(ProvisionError::command(format!(
            "{} failed (exit code {}): {}",
            context,
            self.exit_code.unwrap_or(-1),
            self.stderr.trim()
        )))
    }
}

/// Trait for typed command arguments.
///
/// # Contract
///
/// - `program()`: Returns the executable name (resolved through PATH).
/// - `to_cli_args()`: Returns arguments exactly as the program expects them.
/// - `get_env_vars()`: Returns environment variables the program requires.
pub trait CommandArgs {
    fn program(&self) -> &'static str;

    fn to_cli_args(&self) -> Vec<String>;

    fn get_env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Query-only commands keep running in dry-run mode.
    fn is_read_only(&self) -> bool {
        false
    }

    fn to_command(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(self.program()).args(self.to_cli_args());
        for (key, value) in self.get_env_vars() {
            spec = spec.env(key, value);
        }
        if self.is_read_only() {
            spec = spec.read_only();
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoArgs {
        word: String,
    }

    impl CommandArgs for EchoArgs {
        fn program(&self) -> &'static str {
            "echo"
        }

        fn to_cli_args(&self) -> Vec<String> {
            vec![self.word.clone()]
        }

        fn get_env_vars(&self) -> Vec<(String, String)> {
            vec![("LC_ALL".to_string(), "C".to_string())]
        }

        fn is_read_only(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_typed_args_to_command() {
        let spec = EchoArgs { word: "hi".into() }.to_command();
        assert_eq!(spec.program, "echo");
        assert_eq!(spec.args, vec!["hi"]);
        assert_eq!(spec.env, vec![("LC_ALL".to_string(), "C".to_string())]);
        assert!(spec.read_only);
    }

    #[test]
    fn test_as_user_wraps_in_sudo() {
        let spec = CommandSpec::new("git")
            .args(["config", "--global", "user.name", "Ada"])
            .as_user("ada");
        assert_eq!(spec.program, "sudo");
        assert!(spec.matches("sudo", &["-u", "ada", "-H", "--", "git", "config"]));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new("adduser").args(["--gecos", "", "bob"]);
        assert_eq!(spec.to_string(), "adduser --gecos \"\" bob");

        let spec = CommandSpec::shell("echo hi");
        assert_eq!(spec.to_string(), "bash -c \"echo hi\"");
    }

    #[test]
    fn test_ensure_success() {
        assert!(CommandOutput::ok("").ensure_success("ok").is_ok());

        let err = CommandOutput::failed(100, "E: Unable to locate package\n")
            .ensure_success("apt-get install")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Command failed: apt-get install failed (exit code 100): E: Unable to locate package"
        );

        let err = CommandOutput::timed_out(String::new(), String::new())
            .ensure_success("apt-get update")
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
