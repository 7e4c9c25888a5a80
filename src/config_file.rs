//! JSON settings file handling.
//!
//! Every field is optional: an absent field means "not set by the file" and
//! lets environment variables, CLI flags or defaults decide.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::actions::users::validate_username;
use crate::types::ModuleId;

/// Settings that can be saved to and loaded from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetupConfig {
    /// Modules to run when no selection is given on the command line
    pub modules: Option<Vec<ModuleId>>,

    // User account
    pub username: Option<String>,
    pub git_user_name: Option<String>,
    pub git_user_email: Option<String>,

    // System
    pub timezone: Option<String>,
    pub node_version: Option<String>,
    pub python_version: Option<String>,
    pub backup_dir: Option<String>,
    pub log_file: Option<String>,

    // Package installer
    pub max_retries: Option<u32>,
    pub package_timeout_secs: Option<u64>,
    pub retry_delay_secs: Option<u64>,
    pub isolate_failures: Option<bool>,

    // Finish
    pub reboot: Option<bool>,
}

impl SetupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse settings JSON")?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the values that are present
    pub fn validate(&self) -> Result<()> {
        if let Some(ref username) = self.username {
            validate_username(username.trim())?;
        }

        if let Some(ref timezone) = self.timezone {
            if timezone.trim().is_empty() || timezone.contains(char::is_whitespace) {
                anyhow::bail!("Timezone must be a single zone name such as Europe/Berlin");
            }
        }

        if self.max_retries == Some(0) {
            anyhow::bail!("max_retries must be at least 1");
        }

        if self.package_timeout_secs == Some(0) {
            anyhow::bail!("package_timeout_secs must be greater than zero");
        }

        if let Some(ref email) = self.git_user_email {
            if !email.contains('@') {
                anyhow::bail!("git_user_email must be an email address");
            }
        }

        if let Some(ref dir) = self.backup_dir {
            if !dir.starts_with('/') {
                anyhow::bail!("backup_dir must be an absolute path");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn full_config() -> SetupConfig {
        SetupConfig {
            modules: Some(vec![ModuleId::Core, ModuleId::Security]),
            username: Some("ada".to_string()),
            git_user_name: Some("Ada Lovelace".to_string()),
            git_user_email: Some("ada@example.com".to_string()),
            timezone: Some("Europe/London".to_string()),
            node_version: Some("20".to_string()),
            python_version: Some("3.12".to_string()),
            backup_dir: Some("/srv/backups".to_string()),
            log_file: Some("/tmp/setup.log".to_string()),
            max_retries: Some(5),
            package_timeout_secs: Some(900),
            retry_delay_secs: Some(1),
            isolate_failures: Some(true),
            reboot: Some(false),
        }
    }

    #[test]
    fn test_default_config_is_valid_and_empty() {
        let config = SetupConfig::new();
        assert!(config.validate().is_ok());
        assert!(config.username.is_none());
        assert!(config.modules.is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let original = full_config();
        let temp_file = NamedTempFile::new().unwrap();

        original.save_to_file(temp_file.path()).unwrap();
        let loaded = SetupConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_partial_json_loads() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), r#"{ "modules": ["core", "vm-guest"], "timezone": "UTC" }"#).unwrap();

        let loaded = SetupConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(loaded.modules, Some(vec![ModuleId::Core, ModuleId::VmGuest]));
        assert_eq!(loaded.timezone.as_deref(), Some("UTC"));
        assert!(loaded.username.is_none());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), r#"{ "user_name": "ada" }"#).unwrap();
        assert!(SetupConfig::load_from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(SetupConfig::load_from_file("/nonexistent/settings.json").is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = full_config();
        config.username = Some("1user".to_string());
        assert!(config.validate().is_err());

        let mut config = full_config();
        config.max_retries = Some(0);
        assert!(config.validate().is_err());

        let mut config = full_config();
        config.backup_dir = Some("relative/dir".to_string());
        assert!(config.validate().is_err());

        let mut config = full_config();
        config.timezone = Some("Europe London".to_string());
        assert!(config.validate().is_err());
    }
}
