//! Settings resolution.
//!
//! Every tunable is resolved exactly once, before any provisioning step, in
//! this precedence order (later wins):
//!
//! 1. built-in defaults
//! 2. JSON settings file (`--config`)
//! 3. environment variables
//! 4. command-line flags
//! 5. interactive prompts, only for values still missing
//!
//! Environment lookup is injected as a closure so resolution can be tested
//! without touching the process environment.

use crate::actions::users::validate_username;
use crate::config_file::SetupConfig;
use crate::error::{ProvisionError, Result};
use crate::installer::RetryPolicy;
use crate::prompt::Prompter;
use crate::selection::{Selection, menu_lines};
use crate::types::{ModuleId, Toggle};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_NODE_VERSION: &str = "lts/*";
pub const DEFAULT_PYTHON_VERSION: &str = "3";
pub const DEFAULT_BACKUP_DIR: &str = "/var/backups/ubuntu-setup";
pub const DEFAULT_LOG_FILE: &str = "/var/log/ubuntu-setup.log";

const USERNAME_ATTEMPTS: usize = 3;

/// Values taken from the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub selection: Option<String>,
    pub username: Option<String>,
    pub skip_reboot: bool,
    pub dry_run: bool,
    pub isolate_failures: bool,
    pub log_file: Option<PathBuf>,
    pub non_interactive: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub username: Option<String>,
    pub git_user_name: Option<String>,
    pub git_user_email: Option<String>,
    pub timezone: String,
    pub node_version: String,
    pub python_version: String,
    pub backup_dir: PathBuf,
    pub log_file: PathBuf,
    pub retry: RetryPolicy,
    pub isolate_failures: bool,
    pub reboot: Toggle,
    pub skip_reboot: Toggle,
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: None,
            git_user_name: None,
            git_user_email: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            node_version: DEFAULT_NODE_VERSION.to_string(),
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            retry: RetryPolicy::default(),
            isolate_failures: false,
            reboot: Toggle::Unset,
            skip_reboot: Toggle::Unset,
            dry_run: false,
        }
    }
}

impl Settings {
    /// Reboot only when asked for, not skipped, and not a dry run.
    pub fn should_reboot(&self) -> bool {
        self.reboot.resolve(false) && !self.skip_reboot.resolve(false) && !self.dry_run
    }

    /// Defaults, file, environment and CLI layered and validated, without
    /// prompting.
    pub fn layered(
        cli: &CliOverrides,
        file: Option<&SetupConfig>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Settings> {
        let mut settings = Settings::default();
        if let Some(file) = file {
            settings.apply_file(file);
        }
        settings.apply_env(env)?;
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Settings as a JSON settings file, for `--save-config`.
    pub fn to_config(&self, selection: &Selection) -> SetupConfig {
        SetupConfig {
            modules: (!selection.is_empty()).then(|| selection.iter().collect()),
            username: self.username.clone(),
            git_user_name: self.git_user_name.clone(),
            git_user_email: self.git_user_email.clone(),
            timezone: Some(self.timezone.clone()),
            node_version: Some(self.node_version.clone()),
            python_version: Some(self.python_version.clone()),
            backup_dir: Some(self.backup_dir.display().to_string()),
            log_file: Some(self.log_file.display().to_string()),
            max_retries: Some(self.retry.attempts),
            package_timeout_secs: Some(self.retry.timeout.as_secs()),
            retry_delay_secs: Some(self.retry.delay.as_secs()),
            isolate_failures: Some(self.isolate_failures),
            reboot: match self.reboot {
                Toggle::Unset => None,
                toggle => Some(toggle.resolve(false)),
            },
        }
    }

    fn apply_file(&mut self, file: &SetupConfig) {
        let set = |target: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *target = v.clone();
            }
        };
        if file.username.is_some() {
            self.username = file.username.clone();
        }
        if file.git_user_name.is_some() {
            self.git_user_name = file.git_user_name.clone();
        }
        if file.git_user_email.is_some() {
            self.git_user_email = file.git_user_email.clone();
        }
        set(&mut self.timezone, &file.timezone);
        set(&mut self.node_version, &file.node_version);
        set(&mut self.python_version, &file.python_version);
        if let Some(ref dir) = file.backup_dir {
            self.backup_dir = PathBuf::from(dir);
        }
        if let Some(ref path) = file.log_file {
            self.log_file = PathBuf::from(path);
        }
        if let Some(attempts) = file.max_retries {
            self.retry.attempts = attempts;
        }
        if let Some(secs) = file.package_timeout_secs {
            self.retry.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.retry_delay_secs {
            self.retry.delay = Duration::from_secs(secs);
        }
        if let Some(isolate) = file.isolate_failures {
            self.isolate_failures = isolate;
        }
        self.reboot = Toggle::from(file.reboot).or(self.reboot);
    }

    fn apply_env(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SETUP_USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = get("GIT_USER_NAME") {
            self.git_user_name = Some(v);
        }
        if let Some(v) = get("GIT_USER_EMAIL") {
            self.git_user_email = Some(v);
        }
        if let Some(v) = get("TIMEZONE") {
            self.timezone = v;
        }
        if let Some(v) = get("NODE_VERSION") {
            self.node_version = v;
        }
        if let Some(v) = get("PYTHON_VERSION") {
            self.python_version = v;
        }
        if let Some(v) = get("BACKUP_DIR") {
            self.backup_dir = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_FILE") {
            self.log_file = PathBuf::from(v);
        }
        if let Some(v) = get("MAX_RETRIES") {
            self.retry.attempts = parse_number::<u32>("MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("PACKAGE_TIMEOUT") {
            self.retry.timeout = Duration::from_secs(parse_number("PACKAGE_TIMEOUT", &v)?);
        }
        if let Some(v) = get("RETRY_DELAY") {
            self.retry.delay = Duration::from_secs(parse_number("RETRY_DELAY", &v)?);
        }
        if let Some(v) = get("SKIP_REBOOT") {
            self.skip_reboot = Toggle::parse_flag(&v).or(self.skip_reboot);
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(ref username) = cli.username {
            self.username = Some(username.trim().to_string());
        }
        if let Some(ref path) = cli.log_file {
            self.log_file = path.clone();
        }
        if cli.skip_reboot {
            self.skip_reboot = Toggle::Yes;
        }
        if cli.isolate_failures {
            self.isolate_failures = true;
        }
        self.dry_run = cli.dry_run;
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref username) = self.username {
            validate_username(username)?;
        }
        if self.retry.attempts == 0 {
            return Err(ProvisionError::config("MAX_RETRIES must be at least 1"));
        }
        if self.retry.timeout.is_zero() {
            return Err(ProvisionError::config("PACKAGE_TIMEOUT must be greater than zero"));
        }
        if !self.backup_dir.is_absolute() {
            return Err(ProvisionError::config(format!(
                "backup directory {} is not absolute",
                self.backup_dir.display()
            )));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ProvisionError::config(format!("{} must be a non-negative integer, got {:?}", key, value)))
}

/// Modules that act on the provisioned user.
pub fn needs_username(selection: &Selection) -> bool {
    selection.contains(ModuleId::Core) || selection.contains(ModuleId::Server)
}

/// Resolve the selection and settings from every source.
///
/// Prompts only fill gaps: the selection when neither the command line nor
/// the file named one, the username when a user-facing module is selected,
/// and the reboot choice when no source set it.
pub fn resolve(
    cli: &CliOverrides,
    file: Option<&SetupConfig>,
    env: &dyn Fn(&str) -> Option<String>,
    prompter: &mut dyn Prompter,
) -> Result<(Selection, Settings)> {
    let mut settings = Settings::layered(cli, file, env)?;

    let selection = match (&cli.selection, file.and_then(|f| f.modules.as_ref())) {
        (Some(text), _) => Selection::parse(text),
        (None, Some(modules)) => Selection::from_modules(modules.iter().copied()),
        (None, None) => {
            prompter.show(&menu_lines());
            let answer = prompter.text("Select modules (e.g. 1,2,5 or all):")?;
            Selection::parse(answer.as_deref().unwrap_or_default())
        }
    };
    for token in selection.ignored() {
        warn!("ignoring unknown module selection {:?}", token);
    }

    if settings.username.is_none() && needs_username(&selection) {
        settings.username = prompt_username(prompter)?;
    }

    if !settings.reboot.is_set() && !settings.skip_reboot.resolve(false) && !selection.is_empty() {
        settings.reboot = Toggle::from(prompter.confirm("Reboot when finished?", false)?);
    }

    debug!(?settings, modules = selection.len(), "settings resolved");
    Ok((selection, settings))
}

fn prompt_username(prompter: &mut dyn Prompter) -> Result<Option<String>> {
    for _ in 0..USERNAME_ATTEMPTS {
        let Some(answer) = prompter.text("Username to provision:")? else {
            return Ok(None);
        };
        match validate_username(&answer) {
            Ok(()) => return Ok(Some(answer)),
            Err(e) => warn!("{}", e),
        }
    }
    Ok(None)
}
