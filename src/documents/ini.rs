//! INI documents (fail2ban `jail.local` and friends).
//!
//! Backed by `configparser` in case-sensitive mode so section names such as
//! `DEFAULT` and `sshd` survive a round trip. Comments are not preserved.

use crate::error::{ProvisionError, Result};
use configparser::ini::Ini;

pub struct IniDocument {
    ini: Ini,
}

impl IniDocument {
    pub fn new() -> Self {
        Self { ini: Ini::new_cs() }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut ini = Ini::new_cs();
        ini.read(text.to_string())
            .map_err(|e| ProvisionError::config(format!("invalid INI document: {}", e)))?;
        Ok(Self { ini })
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    /// Set `section.key`. Returns true if the value changed.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> bool {
        if self.get(section, key).as_deref() == Some(value) {
            return false;
        }
        self.ini.set(section, key, Some(value.to_string()));
        true
    }

    /// Apply `(section, key, value)` overrides. Returns true if anything changed.
    pub fn apply(&mut self, overrides: &[(&str, &str, &str)]) -> bool {
        overrides
            .iter()
            .fold(false, |changed, (section, key, value)| self.set(section, key, value) | changed)
    }

    pub fn render(&self) -> String {
        self.ini.writes()
    }
}

impl Default for IniDocument {
    fn default() -> Self {
        Self::new()
    }
}
