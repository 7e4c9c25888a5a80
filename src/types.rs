//! Type-safe vocabulary for the provisioning sequencer
//!
//! This module replaces stringly-typed menu choices and "y"/"n"/"" flags with
//! proper Rust enums that provide exhaustive matching.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Independently selectable provisioning module.
///
/// Declaration order is the canonical execution order, so `Ord` and
/// `EnumIter` both yield core first and hyperv-guest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive)]
pub enum ModuleId {
    #[strum(serialize = "core")]
    Core,
    #[strum(serialize = "security")]
    Security,
    #[strum(serialize = "server")]
    Server,
    #[strum(serialize = "desktop")]
    Desktop,
    #[strum(serialize = "gui")]
    Gui,
    #[strum(serialize = "vm-guest")]
    VmGuest,
    #[strum(serialize = "hyperv-guest")]
    HypervGuest,
}

impl ModuleId {
    /// Menu digit shown to the operator (1-based)
    pub fn menu_digit(self) -> u8 {
        match self {
            Self::Core => 1,
            Self::Security => 2,
            Self::Server => 3,
            Self::Desktop => 4,
            Self::Gui => 5,
            Self::VmGuest => 6,
            Self::HypervGuest => 7,
        }
    }

    /// Look up a module by its menu digit
    pub fn from_menu_digit(digit: u8) -> Option<Self> {
        Self::iter().find(|module| module.menu_digit() == digit)
    }

    /// Human-readable title used in the menu and the summary file
    pub fn title(self) -> &'static str {
        match self {
            Self::Core => "Core System Setup",
            Self::Security => "Security Hardening",
            Self::Server => "Server Setup",
            Self::Desktop => "Desktop Environment",
            Self::Gui => "GUI Applications",
            Self::VmGuest => "VM Guest Additions",
            Self::HypervGuest => "Hyper-V Guest Additions",
        }
    }
}

/// Tri-state flag resolved once during configuration resolution.
///
/// `Unset` means "no source said anything", which lets later sources and
/// defaults fill the gap instead of treating an empty string as yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumIter)]
pub enum Toggle {
    #[default]
    #[strum(to_string = "unset")]
    Unset,
    #[strum(to_string = "yes")]
    Yes,
    #[strum(to_string = "no")]
    No,
}

impl Toggle {
    /// Parse a flag value as found in environment variables or answers.
    ///
    /// Unrecognized and empty values are `Unset`.
    pub fn parse_flag(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" | "on" => Self::Yes,
            "n" | "no" | "false" | "0" | "off" => Self::No,
            _ => Self::Unset,
        }
    }

    /// Returns true if a source set this toggle
    pub fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// First set toggle wins
    pub fn or(self, fallback: Toggle) -> Toggle {
        if self.is_set() { self } else { fallback }
    }

    /// Collapse to a boolean, using `default` when unset
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Self::Yes => true,
            Self::No => false,
            Self::Unset => default,
        }
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }
}

impl From<Option<bool>> for Toggle {
    fn from(value: Option<bool>) -> Self {
        value.map(Toggle::from).unwrap_or_default()
    }
}

/// Outcome of a single package within a module batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum PackageStatus {
    #[default]
    Pending,
    Installed,
    AlreadyPresent,
    Failed,
}

impl PackageStatus {
    /// Returns true once the installer has finalized the record
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_module_id_serialization() {
        assert_eq!(ModuleId::Core.to_string(), "core");
        assert_eq!(ModuleId::VmGuest.to_string(), "vm-guest");
        assert_eq!(ModuleId::HypervGuest.to_string(), "hyperv-guest");
    }

    #[test]
    fn test_module_id_parsing_is_case_insensitive() {
        assert_eq!(ModuleId::from_str("Security").unwrap(), ModuleId::Security);
        assert_eq!(ModuleId::from_str("VM-GUEST").unwrap(), ModuleId::VmGuest);
        assert!(ModuleId::from_str("kubernetes").is_err());
    }

    #[test]
    fn test_menu_digits_follow_canonical_order() {
        let digits: Vec<u8> = ModuleId::iter().map(ModuleId::menu_digit).collect();
        assert_eq!(digits, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(ModuleId::from_menu_digit(1), Some(ModuleId::Core));
        assert_eq!(ModuleId::from_menu_digit(7), Some(ModuleId::HypervGuest));
        assert_eq!(ModuleId::from_menu_digit(0), None);
        assert_eq!(ModuleId::from_menu_digit(8), None);
    }

    #[test]
    fn test_core_title() {
        assert_eq!(ModuleId::Core.title(), "Core System Setup");
    }

    #[test]
    fn test_toggle_parse_flag() {
        assert_eq!(Toggle::parse_flag("y"), Toggle::Yes);
        assert_eq!(Toggle::parse_flag(" YES "), Toggle::Yes);
        assert_eq!(Toggle::parse_flag("0"), Toggle::No);
        assert_eq!(Toggle::parse_flag(""), Toggle::Unset);
        assert_eq!(Toggle::parse_flag("maybe"), Toggle::Unset);
    }

    #[test]
    fn test_toggle_precedence_and_resolution() {
        assert_eq!(Toggle::Unset.or(Toggle::No), Toggle::No);
        assert_eq!(Toggle::Yes.or(Toggle::No), Toggle::Yes);
        assert!(Toggle::Unset.resolve(true));
        assert!(!Toggle::No.resolve(true));
        assert_eq!(Toggle::from(Some(true)), Toggle::Yes);
        assert_eq!(Toggle::from(None), Toggle::Unset);
    }

    #[test]
    fn test_package_status_display() {
        assert_eq!(PackageStatus::AlreadyPresent.to_string(), "already-present");
        assert!(!PackageStatus::Pending.is_final());
        assert!(PackageStatus::Failed.is_final());
    }
}
