//! nginx hardening fragment.

use super::system::{SystemctlAction, systemctl};
use super::{ActionOutcome, apply_guarded_file};
use crate::command::CommandSpec;
use crate::error::Result;
use crate::host::Host;
use std::path::Path;

pub const NGINX_FRAGMENT: &str = "/etc/nginx/conf.d/99-hardening.conf";

const HARDENING: &str = "# Managed by ubuntu-setup
server_tokens off;
client_max_body_size 16m;
add_header X-Frame-Options SAMEORIGIN always;
add_header X-Content-Type-Options nosniff always;
add_header Referrer-Policy strict-origin-when-cross-origin always;
";

/// Write the fragment, keep it only if `nginx -t` accepts it, reload on change.
pub fn harden_nginx(host: &dyn Host) -> Result<ActionOutcome> {
    let validate = CommandSpec::new("nginx").arg("-t");
    let outcome = apply_guarded_file(
        host,
        Path::new(NGINX_FRAGMENT),
        HARDENING.as_bytes(),
        Some(0o644),
        &validate,
    )?;
    if outcome.changed() {
        systemctl(host, SystemctlAction::Reload, "nginx")?;
    }
    Ok(outcome)
}
