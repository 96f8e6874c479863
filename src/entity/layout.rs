use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::constants::btrfs;
use crate::utils::fs::prepend_base;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subvolume {
    pub name: String,
    /// Mount point relative to the mount root, empty for the root subvolume
    pub mountpoint: String,
}

impl Subvolume {
    pub fn is_root(&self) -> bool {
        self.mountpoint.is_empty()
    }
}

/// The fixed btrfs subvolume hierarchy, root subvolume first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubvolumeLayout {
    subvolumes: Vec<Subvolume>,
}

impl Default for SubvolumeLayout {
    fn default() -> Self {
        Self {
            subvolumes: btrfs::SUBVOLUMES
                .iter()
                .map(|(name, mountpoint)| Subvolume {
                    name: name.to_string(),
                    mountpoint: mountpoint.to_string(),
                })
                .collect(),
        }
    }
}

impl SubvolumeLayout {
    pub fn all(&self) -> &[Subvolume] {
        &self.subvolumes
    }

    pub fn root(&self) -> &Subvolume {
        &self.subvolumes[0]
    }

    pub fn children(&self) -> &[Subvolume] {
        &self.subvolumes[1..]
    }
}

/// Mount options shared by every subvolume of the root filesystem.
/// Only `subvol=` differs between subvolumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountOptions {
    pub atime: String,
    pub compress: String,
    pub space_cache: String,
    pub discard: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            atime: btrfs::ATIME.to_string(),
            compress: btrfs::COMPRESSION.to_string(),
            space_cache: btrfs::SPACE_CACHE.to_string(),
            discard: btrfs::DISCARD.to_string(),
        }
    }
}

impl MountOptions {
    /// Options without any subvolume selection
    pub fn shared(&self) -> String {
        format!(
            "{},compress={},space_cache={},discard={}",
            self.atime, self.compress, self.space_cache, self.discard
        )
    }

    /// Full option string selecting `subvolume`
    pub fn for_subvolume(&self, subvolume: &str) -> String {
        format!("{},subvol={subvolume}", self.shared())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    pub source: String,
    pub subvolume: String,
    pub target: PathBuf,
    pub options: String,
}

/// Where every subvolume of the root partition is mounted, in mount order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPlan {
    pub entries: Vec<MountEntry>,
    pub options: MountOptions,
}

impl MountPlan {
    pub fn new(
        root_partition: &str,
        layout: &SubvolumeLayout,
        options: &MountOptions,
        mount_root: &Path,
    ) -> Self {
        let entries = layout
            .all()
            .iter()
            .map(|subvol| MountEntry {
                source: root_partition.to_string(),
                subvolume: subvol.name.clone(),
                target: prepend_base(mount_root, &subvol.mountpoint),
                options: options.for_subvolume(&subvol.name),
            })
            .collect();

        Self {
            entries,
            options: options.clone(),
        }
    }

    pub fn root(&self) -> &MountEntry {
        &self.entries[0]
    }

    pub fn children(&self) -> &[MountEntry] {
        &self.entries[1..]
    }
}

/// Strips the `subvol=` field from an option string
pub fn without_subvol(options: &str) -> String {
    options
        .split(',')
        .filter(|opt| !opt.starts_with("subvol="))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = SubvolumeLayout::default();
        let names: Vec<_> = layout.all().iter().map(|s| s.name.as_str()).collect();

        assert_eq!(vec!["@", "@home", "@var", "@log", "@cache", "@snapshots"], names);
        assert!(layout.root().is_root());
        assert!(layout.children().iter().all(|s| !s.is_root()));
    }

    #[test]
    fn test_mount_plan_targets() {
        let plan = MountPlan::new(
            "/dev/sda2",
            &SubvolumeLayout::default(),
            &MountOptions::default(),
            Path::new("/mnt"),
        );

        let targets: Vec<_> = plan
            .entries
            .iter()
            .map(|e| e.target.to_string_lossy().to_string())
            .collect();

        assert_eq!(
            vec![
                "/mnt",
                "/mnt/home",
                "/mnt/var",
                "/mnt/var/log",
                "/mnt/var/cache",
                "/mnt/.snapshots"
            ],
            targets
        );
    }

    #[test]
    fn test_options_differ_only_in_subvol() {
        let plan = MountPlan::new(
            "/dev/nvme0n1p3",
            &SubvolumeLayout::default(),
            &MountOptions::default(),
            Path::new("/mnt"),
        );

        let root_opts = without_subvol(&plan.root().options);
        assert_eq!("noatime,compress=zstd:3,space_cache=v2,discard=async", root_opts);

        for entry in plan.children() {
            assert_eq!(root_opts, without_subvol(&entry.options));
            assert!(entry.options.ends_with(&format!("subvol={}", entry.subvolume)));
            assert_eq!(plan.root().source, entry.source);
        }
    }
}
