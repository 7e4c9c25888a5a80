//! `sshd_config`-style keyword documents.
//!
//! Lines are kept verbatim except for directives we override, so a merge
//! touches only what it owns. Keywords are case-insensitive, and since sshd
//! honours the first value it sees, a set replaces the first global occurrence
//! and drops later duplicates. New directives go before the first `Match`
//! block; anything after it would be scoped to that block.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// `raw` keeps the original text until the value is overridden
    Directive {
        key: String,
        value: String,
        raw: Option<String>,
    },
    Verbatim(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SshdConfig {
    lines: Vec<Line>,
}

impl SshdConfig {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|raw| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Line::Verbatim(raw.to_string());
                }
                let (key, value) = match trimmed.find(|c: char| c.is_whitespace() || c == '=') {
                    Some(idx) => (
                        &trimmed[..idx],
                        trimmed[idx..].trim_start_matches(|c: char| c.is_whitespace() || c == '='),
                    ),
                    None => (trimmed, ""),
                };
                Line::Directive {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                    raw: Some(raw.to_string()),
                }
            })
            .collect();
        Self { lines }
    }

    /// Document holding a single comment header.
    pub fn with_header(header: &str) -> Self {
        Self {
            lines: vec![Line::Verbatim(format!("# {}", header))],
        }
    }

    /// First global value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.global_lines().find_map(|line| match line {
            Line::Directive { key: k, value, .. } if k.eq_ignore_ascii_case(key) => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set a global directive. Returns true if the document changed.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let end = self.global_end();
        let positions: Vec<usize> = (0..end)
            .filter(|&i| matches!(&self.lines[i], Line::Directive { key: k, .. } if k.eq_ignore_ascii_case(key)))
            .collect();

        let Some((&first, rest)) = positions.split_first() else {
            self.lines.insert(
                end,
                Line::Directive {
                    key: key.to_string(),
                    value: value.to_string(),
                    raw: None,
                },
            );
            return true;
        };

        let mut changed = false;
        if let Line::Directive { value: current, raw, .. } = &mut self.lines[first] {
            if current != value {
                *current = value.to_string();
                *raw = None;
                changed = true;
            }
        }
        for &idx in rest.iter().rev() {
            self.lines.remove(idx);
            changed = true;
        }
        changed
    }

    /// Apply a set of overrides. Returns true if anything changed.
    pub fn apply<K, V>(&mut self, overrides: &[(K, V)]) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        overrides
            .iter()
            .fold(false, |changed, (k, v)| self.set(k.as_ref(), v.as_ref()) | changed)
    }

    fn global_end(&self) -> usize {
        self.lines
            .iter()
            .position(|line| matches!(line, Line::Directive { key, .. } if key.eq_ignore_ascii_case("Match")))
            .unwrap_or(self.lines.len())
    }

    fn global_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().take(self.global_end())
    }
}

impl fmt::Display for SshdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                Line::Directive { raw: Some(raw), .. } => writeln!(f, "{}", raw)?,
                Line::Directive { key, value, .. } if value.is_empty() => writeln!(f, "{}", key)?,
                Line::Directive { key, value, .. } => writeln!(f, "{} {}", key, value)?,
                Line::Verbatim(raw) => writeln!(f, "{}", raw)?,
            }
        }
        Ok(())
    }
}
