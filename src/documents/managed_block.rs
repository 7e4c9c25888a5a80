//! Marker-delimited blocks inside files we do not own.
//!
//! ```text
//! # BEGIN ubuntu-setup <name>
//! ...managed lines...
//! # END ubuntu-setup <name>
//! ```
//!
//! Everything outside the markers is left untouched. Upserting the same body
//! twice yields the same text, so re-runs never duplicate entries.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedBlock {
    name: String,
}

impl ManagedBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn begin_marker(&self) -> String {
        format!("# BEGIN ubuntu-setup {}", self.name)
    }

    pub fn end_marker(&self) -> String {
        format!("# END ubuntu-setup {}", self.name)
    }

    /// The block itself, markers included, newline-terminated.
    pub fn render(&self, body: &str) -> String {
        let mut out = self.begin_marker();
        out.push('\n');
        for line in body.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.end_marker());
        out.push('\n');
        out
    }

    pub fn contains(&self, text: &str) -> bool {
        self.span(text).is_some()
    }

    /// Managed lines currently in `text`, without markers.
    pub fn body<'t>(&self, text: &'t str) -> Option<Vec<&'t str>> {
        let lines: Vec<&str> = text.lines().collect();
        self.span_in(&lines).map(|(start, end)| lines[start + 1..end].to_vec())
    }

    /// Replace the block in `text` with `body`, or append it if missing.
    ///
    /// A begin marker without a matching end marker is treated as absent and
    /// a fresh block is appended.
    pub fn upsert(&self, text: &str, body: &str) -> String {
        let lines: Vec<&str> = text.lines().collect();
        let block = self.render(body);

        match self.span_in(&lines) {
            Some((start, end)) => {
                let mut out = String::new();
                for line in &lines[..start] {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str(&block);
                for line in &lines[end + 1..] {
                    out.push_str(line);
                    out.push('\n');
                }
                out
            }
            None => {
                let mut out = text.to_string();
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&block);
                out
            }
        }
    }

    fn span(&self, text: &str) -> Option<(usize, usize)> {
        let lines: Vec<&str> = text.lines().collect();
        self.span_in(&lines)
    }

    fn span_in(&self, lines: &[&str]) -> Option<(usize, usize)> {
        let begin = self.begin_marker();
        let end = self.end_marker();
        let start = lines.iter().position(|l| l.trim_end() == begin)?;
        let stop = lines[start + 1..].iter().position(|l| l.trim_end() == end)?;
        Some((start, start + 1 + stop))
    }
}
