//! Configuration backup archive.
//!
//! Files are read through the host and packed in memory, so the archive
//! holds exactly what the sequencer saw before it changed anything.

use crate::error::Result;
use crate::host::Host;
use std::path::{Path, PathBuf};
use tar::{Builder, Header};
use tracing::{debug, info};

/// Files snapshotted before the first module touches them.
pub const BACKUP_SOURCES: &[&str] = &[
    "/etc/ssh/sshd_config",
    "/etc/ssh/sshd_config.d/00-hardening.conf",
    "/etc/crontab",
    "/etc/fail2ban/jail.local",
    "/etc/ufw/ufw.conf",
    "/etc/nginx/nginx.conf",
    "/etc/initramfs-tools/modules",
    "/etc/hosts",
    "/etc/fstab",
];

pub fn archive_name(timestamp: &str) -> String {
    format!("config-backup-{}.tar", timestamp)
}

/// Pack `(path, contents)` pairs into an uncompressed tar image.
///
/// Entry names are the absolute paths without the leading `/`.
pub fn build_archive(files: &[(PathBuf, Vec<u8>)], mtime: u64) -> Result<Vec<u8>> {
    let mut archive = Builder::new(Vec::new());
    for (path, data) in files {
        let name = path.strip_prefix("/").unwrap_or(path);
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o600);
        header.set_mtime(mtime);
        header.set_cksum();
        archive.append_data(&mut header, name, data.as_slice())?;
    }
    Ok(archive.into_inner()?)
}

/// Back up every existing file in `sources` into
/// `<backup_dir>/config-backup-<timestamp>.tar`.
///
/// Returns `None` when none of the sources exist.
pub fn backup_configs(
    host: &dyn Host,
    backup_dir: &Path,
    sources: &[&str],
    timestamp: &str,
    mtime: u64,
) -> Result<Option<PathBuf>> {
    let mut files = Vec::new();
    for source in sources {
        let path = PathBuf::from(source);
        match host.read_file(&path)? {
            Some(data) => files.push((path, data)),
            None => debug!("backup: {} not present", source),
        }
    }
    if files.is_empty() {
        return Ok(None);
    }

    let bytes = build_archive(&files, mtime)?;
    let target = backup_dir.join(archive_name(timestamp));
    host.write_file(&target, &bytes, Some(0o600))?;
    info!("backed up {} files to {}", files.len(), target.display());
    Ok(Some(target))
}
