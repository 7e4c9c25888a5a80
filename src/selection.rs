//! Module selection parsing.
//!
//! The operator picks modules with a comma-separated list of menu digits
//! (`1,2,5`) or identifiers (`core,security`). Unknown tokens are collected
//! and reported, never treated as an error.

use crate::types::ModuleId;
use std::collections::BTreeSet;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Set of modules chosen for this run, iterated in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    modules: BTreeSet<ModuleId>,
    ignored: Vec<String>,
}

impl Selection {
    /// Parse a comma (or whitespace) separated selection string.
    pub fn parse(input: &str) -> Self {
        let mut selection = Self::default();

        for token in input
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            if token.eq_ignore_ascii_case("all") {
                selection.modules.extend(ModuleId::iter());
                continue;
            }

            let module = token
                .parse::<u8>()
                .ok()
                .and_then(ModuleId::from_menu_digit)
                .or_else(|| ModuleId::from_str(token).ok());

            match module {
                Some(module) => {
                    selection.modules.insert(module);
                }
                None => selection.ignored.push(token.to_string()),
            }
        }

        selection
    }

    /// Build a selection directly from module identifiers.
    pub fn from_modules(modules: impl IntoIterator<Item = ModuleId>) -> Self {
        Self {
            modules: modules.into_iter().collect(),
            ignored: Vec::new(),
        }
    }

    pub fn contains(&self, module: ModuleId) -> bool {
        self.modules.contains(&module)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Selected modules in canonical execution order
    pub fn iter(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules.iter().copied()
    }

    /// Tokens that matched no known module
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }
}

/// Render the interactive menu text.
pub fn menu_lines() -> Vec<String> {
    ModuleId::iter()
        .map(|module| format!("  {}) {} [{}]", module.menu_digit(), module.title(), module))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_digits() {
        let selection = Selection::parse("1,2,5");
        let modules: Vec<ModuleId> = selection.iter().collect();
        assert_eq!(modules, vec![ModuleId::Core, ModuleId::Security, ModuleId::Gui]);
        assert!(selection.ignored().is_empty());
    }

    #[test]
    fn test_parse_orders_canonically_and_dedups() {
        let selection = Selection::parse("7, 1 ,core,3");
        let modules: Vec<ModuleId> = selection.iter().collect();
        assert_eq!(
            modules,
            vec![ModuleId::Core, ModuleId::Server, ModuleId::HypervGuest]
        );
    }

    #[test]
    fn test_unknown_tokens_are_ignored() {
        let selection = Selection::parse("2,9,kubernetes");
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(ModuleId::Security));
        assert_eq!(selection.ignored(), &["9".to_string(), "kubernetes".to_string()]);
    }

    #[test]
    fn test_parse_identifiers_and_all() {
        let selection = Selection::parse("vm-guest gui");
        assert!(selection.contains(ModuleId::VmGuest));
        assert!(selection.contains(ModuleId::Gui));

        assert_eq!(Selection::parse("all").len(), 7);
        assert!(Selection::parse("").is_empty());
    }

    #[test]
    fn test_menu_lines() {
        let lines = menu_lines();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].contains("1) Core System Setup"));
    }
}
