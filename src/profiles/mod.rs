//! Module package profiles.
//!
//! Package lists are kept in Rust enums and constants so typos in names show
//! up in tests and every list lives in one place.
//!
//! # Profiles
//!
//! | Module        | Required packages | Optional | Extra steps |
//! |---------------|-------------------|----------|-------------|
//! | core          | base CLI tools    | -        | user, timezone, git, SSH key, backup |
//! | security      | ufw, fail2ban...  | scanners | SSH, firewall, fail2ban, cron |
//! | server        | nginx, docker...  | -        | nginx fragment, docker, nvm, pipx |
//! | desktop       | GNOME minimal     | fonts    | font cache, graphical target |
//! | gui           | desktop apps      | -        | snaps |
//! | vm-guest      | guest agents      | -        | services |
//! | hyperv-guest  | linux-tools/cloud | -        | initramfs modules |

use crate::types::ModuleId;

/// A snap installed by the GUI module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapApp {
    pub name: &'static str,
    pub classic: bool,
}

pub const CORE_PACKAGES: &[&str] = &[
    "curl",
    "wget",
    "git",
    "vim",
    "htop",
    "tmux",
    "tree",
    "jq",
    "unzip",
    "zip",
    "build-essential",
    "software-properties-common",
    "apt-transport-https",
    "ca-certificates",
    "gnupg",
    "lsb-release",
    "net-tools",
    "plocate",
    "openssh-server",
];

pub const SECURITY_PACKAGES: &[&str] = &[
    "ufw",
    "fail2ban",
    "unattended-upgrades",
    "apt-listchanges",
    "auditd",
];

/// Scanners are nice to have; a missing one is a warning.
pub const SECURITY_OPTIONAL: &[&str] = &["rkhunter", "lynis"];

pub const SERVER_PACKAGES: &[&str] = &[
    "nginx",
    "docker.io",
    "docker-compose-v2",
    "certbot",
    "python3-certbot-nginx",
    "pipx",
];

pub const DESKTOP_PACKAGES: &[&str] = &[
    "ubuntu-desktop-minimal",
    "gnome-tweaks",
    "gnome-shell-extension-manager",
    "xrdp",
];

pub const DESKTOP_OPTIONAL: &[&str] = &["fonts-firacode", "fonts-noto-color-emoji"];

pub const GUI_PACKAGES: &[&str] = &[
    "vlc",
    "gimp",
    "keepassxc",
    "filezilla",
    "remmina",
    "flameshot",
];

pub const GUI_SNAPS: &[SnapApp] = &[SnapApp {
    name: "code",
    classic: true,
}];

pub const VM_GUEST_PACKAGES: &[&str] = &[
    "open-vm-tools",
    "open-vm-tools-desktop",
    "qemu-guest-agent",
    "spice-vdagent",
];

pub const HYPERV_PACKAGES: &[&str] = &["linux-tools-virtual", "linux-cloud-tools-virtual"];

/// Kernel modules loaded early on Hyper-V guests.
pub const HYPERV_INITRAMFS_MODULES: &[&str] = &["hv_vmbus", "hv_storvsc", "hv_blkvsc", "hv_netvsc"];

/// Python interpreter packages for a version such as `3` or `3.12`.
pub fn python_packages(version: &str) -> Vec<String> {
    let version = version.trim();
    let base = if version.is_empty() || version == "3" {
        "python3".to_string()
    } else {
        format!("python{}", version)
    };
    let mut packages = vec![base.clone(), format!("{}-venv", base), format!("{}-dev", base)];
    packages.push("python3-pip".to_string());
    packages
}

/// Required apt packages of a module, in install order.
pub fn packages(module: ModuleId, python_version: &str) -> Vec<String> {
    let base: &[&str] = match module {
        ModuleId::Core => CORE_PACKAGES,
        ModuleId::Security => SECURITY_PACKAGES,
        ModuleId::Server => SERVER_PACKAGES,
        ModuleId::Desktop => DESKTOP_PACKAGES,
        ModuleId::Gui => GUI_PACKAGES,
        ModuleId::VmGuest => VM_GUEST_PACKAGES,
        ModuleId::HypervGuest => HYPERV_PACKAGES,
    };
    let mut list: Vec<String> = base.iter().map(|p| p.to_string()).collect();
    if module == ModuleId::Server {
        list.extend(python_packages(python_version));
    }
    list
}

/// Best-effort apt packages of a module.
pub fn optional_packages(module: ModuleId) -> &'static [&'static str] {
    match module {
        ModuleId::Security => SECURITY_OPTIONAL,
        ModuleId::Desktop => DESKTOP_OPTIONAL,
        _ => &[],
    }
}

/// Services enabled after the module's packages are in place.
pub fn services(module: ModuleId) -> &'static [&'static str] {
    match module {
        ModuleId::Security => &["fail2ban", "auditd"],
        ModuleId::Server => &["nginx", "docker"],
        ModuleId::Desktop => &["xrdp"],
        ModuleId::VmGuest => &["qemu-guest-agent", "open-vm-tools"],
        _ => &[],
    }
}

pub fn snaps(module: ModuleId) -> &'static [SnapApp] {
    match module {
        ModuleId::Gui => GUI_SNAPS,
        _ => &[],
    }
}
