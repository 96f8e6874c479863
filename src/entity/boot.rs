use serde::{
    Deserialize,
    Serialize,
};

use super::layout::MountPlan;
use crate::constants::boot;

/// One systemd-boot loader entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootEntry {
    pub file_name: String,
    pub title: String,
    pub kernel: String,
    pub initramfs: String,
    pub options: String,
}

/// Primary and fallback entries for the same root filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootEntries {
    pub root_uuid: String,
    pub primary: BootEntry,
    pub fallback: BootEntry,
}

impl BootEntries {
    /// Builds both entries from the mount plan actually used for the root
    /// subvolume, so kernel rootflags and mounted options cannot drift.
    pub fn new(root_uuid: &str, mounts: &MountPlan) -> Self {
        let options = format!(
            "root=UUID={root_uuid} rootflags={} rw",
            mounts.root().options
        );

        let primary = BootEntry {
            file_name: boot::ENTRY_PRIMARY.to_string(),
            title: boot::TITLE.to_string(),
            kernel: boot::KERNEL.to_string(),
            initramfs: boot::INITRAMFS.to_string(),
            options,
        };

        let fallback = BootEntry {
            file_name: boot::ENTRY_FALLBACK.to_string(),
            title: format!("{} (fallback initramfs)", boot::TITLE),
            initramfs: boot::INITRAMFS_FALLBACK.to_string(),
            ..primary.clone()
        };

        Self {
            root_uuid: root_uuid.to_string(),
            primary,
            fallback,
        }
    }

    pub fn all(&self) -> [&BootEntry; 2] {
        [&self.primary, &self.fallback]
    }
}

impl BootEntry {
    pub fn render(&self) -> String {
        format!(
            "title   {}\nlinux   {}\ninitrd  {}\noptions {}\n",
            self.title, self.kernel, self.initramfs, self.options
        )
    }

    /// Extracts the filesystem UUID from `root=UUID=...`
    pub fn root_uuid(&self) -> Option<&str> {
        self.options
            .split_whitespace()
            .find_map(|opt| opt.strip_prefix("root=UUID="))
    }

    /// Extracts the value of `rootflags=`
    pub fn rootflags(&self) -> Option<&str> {
        self.options
            .split_whitespace()
            .find_map(|opt| opt.strip_prefix("rootflags="))
    }
}

pub fn render_loader_conf(default_entry: &str, timeout: u32) -> String {
    format!("default {default_entry}\ntimeout {timeout}\nconsole-mode max\neditor  no\n")
}
