//! Latest-release lookup against the GitHub releases API.

use super::run_checked;
use crate::command::CommandSpec;
use crate::error::{ProvisionError, Result};
use crate::host::Host;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    tag_name: String,
}

/// Extract `tag_name` from a releases API response.
pub fn parse_release_tag(json: &str) -> Result<String> {
    let release: ReleaseMetadata = serde_json::from_str(json)?;
    let tag = release.tag_name.trim();
    if tag.is_empty() {
        return Err(ProvisionError::command("release metadata has an empty tag_name"));
    }
    Ok(tag.to_string())
}

/// Fetch the latest release tag of `owner/repo`.
pub fn latest_release_tag(host: &dyn Host, repo: &str) -> Result<String> {
    let url = format!("https://api.github.com/repos/{}/releases/latest", repo);
    let cmd = CommandSpec::new("curl")
        .args(["-fsSL", "-H", "Accept: application/vnd.github+json"])
        .arg(url)
        .timeout(Duration::from_secs(30))
        .read_only();
    let output = run_checked(host, &cmd, &format!("fetch latest {} release", repo))?;
    parse_release_tag(&output.stdout)
}
