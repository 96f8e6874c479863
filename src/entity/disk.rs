use serde::{
    Deserialize,
    Serialize,
};

use super::format_bytes;

/// A whole disk as enumerated from the live system.
/// Never mutated after enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Stable device path, e.g. /dev/nvme0n1
    pub device: String,
    pub size_bytes: u64,
    pub model: String,
}

impl std::fmt::Display for Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.device,
            format_bytes(self.size_bytes),
            self.model
        )
    }
}

/// How the kernel names partitions of a disk.
///
/// See linux/block/partition-generic.c: disk names ending in a digit
/// get a `p` before the partition number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionNaming {
    /// /dev/sda => /dev/sda1
    Plain,
    /// /dev/nvme0n1 => /dev/nvme0n1p1
    PInfix,
}

impl PartitionNaming {
    pub fn classify(device: &str) -> Self {
        match device.chars().last() {
            Some(c) if c.is_ascii_digit() => Self::PInfix,
            _ => Self::Plain,
        }
    }

    pub fn partition(&self, device: &str, number: usize) -> String {
        match self {
            Self::Plain => format!("{device}{number}"),
            Self::PInfix => format!("{device}p{number}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_classify() {
        let tests = HashMap::from([
            ("/dev/nvme0n1", PartitionNaming::PInfix),
            ("/dev/mmcblk0", PartitionNaming::PInfix),
            ("/dev/loop7", PartitionNaming::PInfix),
            ("/dev/sda", PartitionNaming::Plain),
            ("/dev/vdb", PartitionNaming::Plain),
            ("/dev/xvda", PartitionNaming::Plain),
            ("", PartitionNaming::Plain),
        ]);

        for (device, expected) in tests {
            assert_eq!(expected, PartitionNaming::classify(device), "device {device}");
        }
    }

    #[test]
    fn test_partition_name() {
        let tests = HashMap::from([
            (("/dev/nvme0n1", 1), "/dev/nvme0n1p1"),
            (("/dev/mmcblk7", 2), "/dev/mmcblk7p2"),
            (("/dev/vdb", 10), "/dev/vdb10"),
            (("/dev/sda", 5), "/dev/sda5"),
        ]);

        for ((device, part_num), expected) in tests {
            let naming = PartitionNaming::classify(device);
            assert_eq!(expected, naming.partition(device, part_num));
        }
    }

    #[test]
    fn test_display() {
        let disk = Disk {
            device: "/dev/sda".into(),
            size_bytes: 60 * 1024 * 1024 * 1024,
            model: "QEMU HARDDISK".into(),
        };

        assert_eq!("/dev/sda (60.0 GiB, QEMU HARDDISK)", disk.to_string());
    }
}
