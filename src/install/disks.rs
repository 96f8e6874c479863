use crate::constants::limits::*;
use crate::entity::disk::Disk;
use crate::entity::plan::{
    PartitionPlan,
    PartitionSpec,
};
use crate::errors::ProvisionError;
use crate::linux::lsblk;
use crate::utils::shell::Shell;

const GIB: u64 = 1024 * 1024 * 1024;

/// Whole disks of at least `min_bytes`, each listed once
pub fn qualifying(disks: Vec<Disk>, min_bytes: u64) -> Vec<Disk> {
    let mut result: Vec<Disk> = Vec::with_capacity(disks.len());
    for disk in disks {
        if disk.size_bytes < min_bytes {
            tracing::debug!("skipping {disk}: smaller than {min_bytes} bytes");
            continue;
        }

        if result.iter().any(|d| d.device == disk.device) {
            continue;
        }

        result.push(disk);
    }

    result
}

/// Fails when no disk qualifies
pub fn require_disks(disks: Vec<Disk>, min_bytes: u64) -> Result<Vec<Disk>, ProvisionError> {
    let disks = qualifying(disks, min_bytes);
    if disks.is_empty() {
        return Err(ProvisionError::NoQualifyingDisk { min_bytes });
    }

    Ok(disks)
}

/// Largest whole-GiB swap that still leaves room for EFI and root
pub fn max_swap_gb(disk: &Disk) -> u64 {
    disk.size_bytes
        .saturating_sub(EFI_SIZE_BYTES)
        .saturating_sub(MIN_ROOT_BYTES)
        / GIB
}

/// EFI, then optional swap, then root on the rest of `disk`
pub fn build_plan(disk: &Disk, want_swap: bool, swap_size_gb: u64) -> Result<PartitionPlan, ProvisionError> {
    let mut partitions = vec![PartitionSpec::efi(EFI_SIZE_BYTES)];

    if want_swap {
        if swap_size_gb == 0 {
            return Err(ProvisionError::BadInput(
                "swap requested with zero size".to_string(),
            ));
        }

        let swap_bytes = swap_size_gb.checked_mul(GIB).ok_or_else(|| {
            ProvisionError::BadInput(format!("swap size {swap_size_gb} GiB is too large"))
        })?;

        partitions.push(PartitionSpec::swap(swap_bytes));
    }

    partitions.push(PartitionSpec::root());
    let plan = PartitionPlan::new(partitions)?;

    let needed = plan.fixed_bytes().saturating_add(MIN_ROOT_BYTES);
    if needed > disk.size_bytes {
        return Err(ProvisionError::BadInput(format!(
            "{disk} is too small: plan needs at least {needed} bytes"
        )));
    }

    Ok(plan)
}

/// Re-reads `disk` right before it is destroyed and aborts if it is no
/// longer the disk the operator chose.
pub fn verify_unchanged(sh: &dyn Shell, disk: &Disk) -> Result<(), ProvisionError> {
    let current = lsblk::list_disks(sh)?
        .into_iter()
        .find(|d| d.device == disk.device)
        .ok_or_else(|| ProvisionError::NoSuchDevice(disk.device.clone()))?;

    if current != *disk {
        return Err(ProvisionError::Aborted(format!(
            "disk changed since it was selected: planned {disk}, found {current}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::entity::plan::{
        PartitionRole,
        PartitionSize,
    };
    use crate::utils::shell::test_utils::RecordingShell;

    fn disk(device: &str, size_bytes: u64) -> Disk {
        Disk {
            device: device.to_string(),
            size_bytes,
            model: "QEMU HARDDISK".to_string(),
        }
    }

    #[test]
    fn test_qualifying_disk_count() {
        let disks = vec![disk("/dev/sda", 60 * GIB), disk("/dev/sdb", 4 * GIB)];
        let qualified = require_disks(disks, 8 * GIB).unwrap();

        assert_eq!(1, qualified.len());
        assert_eq!("/dev/sda", qualified[0].device);
    }

    #[test]
    fn test_no_qualifying_disk() {
        let disks = vec![disk("/dev/sda", 4 * GIB)];
        assert!(matches!(
            require_disks(disks, 8 * GIB),
            Err(ProvisionError::NoQualifyingDisk { .. })
        ));
    }

    #[test]
    fn test_enumerate_normalizes_units() {
        let sh = RecordingShell::new();
        sh.respond(
            "lsblk",
            r#"{"blockdevices": [
                {"name": "/dev/sda", "size": "60G", "model": "A", "type": "disk"},
                {"name": "/dev/sdb", "size": "4096M", "model": "B", "type": "disk"},
                {"name": "/dev/sdc", "size": "8192M", "model": "C", "type": "disk"},
                {"name": "/dev/sdd", "size": "1T", "model": "D", "type": "disk"}
            ]}"#,
        );

        let disks = require_disks(lsblk::list_disks(&sh).unwrap(), 8 * GIB).unwrap();
        let devices: Vec<_> = disks.iter().map(|d| d.device.as_str()).collect();

        assert_eq!(vec!["/dev/sda", "/dev/sdc", "/dev/sdd"], devices);
    }

    #[test]
    fn test_build_plan_swap() {
        let d = disk("/dev/sda", 60 * GIB);

        let plan = build_plan(&d, false, 0).unwrap();
        assert_eq!(2, plan.len());
        assert!(!plan.has_swap());

        let plan = build_plan(&d, true, 2).unwrap();
        assert_eq!(3, plan.len());
        assert_eq!(PartitionRole::Swap, plan.partitions()[1].role);
        assert_eq!(PartitionSize::Fixed(2 * GIB), plan.partitions()[1].size);

        assert!(build_plan(&d, true, 0).is_err());
        assert!(build_plan(&d, true, 60).is_err());
    }

    #[test]
    fn test_max_swap_gb() {
        assert_eq!(55, max_swap_gb(&disk("/dev/sda", 60 * GIB)));
        assert_eq!(0, max_swap_gb(&disk("/dev/sda", 4 * GIB)));

        let d = disk("/dev/sda", 60 * GIB);
        assert!(build_plan(&d, true, max_swap_gb(&d)).is_ok());
        assert!(build_plan(&d, true, max_swap_gb(&d) + 1).is_err());
    }

    #[test]
    fn test_verify_unchanged() {
        let sh = RecordingShell::new();
        sh.respond(
            "lsblk",
            r#"{"blockdevices": [{"name": "/dev/sda", "size": "60G", "model": "QEMU HARDDISK", "type": "disk"}]}"#,
        );

        assert!(verify_unchanged(&sh, &disk("/dev/sda", 60 * GIB)).is_ok());
        assert!(matches!(
            verify_unchanged(&sh, &disk("/dev/sda", 120 * GIB)),
            Err(ProvisionError::Aborted(_))
        ));
        assert!(matches!(
            verify_unchanged(&sh, &disk("/dev/sdb", 60 * GIB)),
            Err(ProvisionError::NoSuchDevice(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_enumeration_filters_by_capacity(
            sizes in prop::collection::vec(0u64..(64 * GIB), 0..12),
            min in 0u64..(64 * GIB),
        ) {
            let disks: Vec<Disk> = sizes
                .iter()
                .enumerate()
                .map(|(i, size)| disk(&format!("/dev/vd{i}x"), *size))
                .collect();

            let qualified = qualifying(disks.clone(), min);

            for d in &disks {
                let count = qualified.iter().filter(|q| q.device == d.device).count();
                if d.size_bytes >= min {
                    prop_assert_eq!(1, count);
                } else {
                    prop_assert_eq!(0, count);
                }
            }
        }

        #[test]
        fn prop_valid_plans_keep_invariants(
            size_gb in 1u64..4096,
            want_swap in any::<bool>(),
            swap_gb in 0u64..128,
        ) {
            let d = disk("/dev/nvme0n1", size_gb * GIB);
            if let Ok(plan) = build_plan(&d, want_swap, swap_gb) {
                let count = |role| plan.partitions().iter().filter(|p| p.role == role).count();

                prop_assert_eq!(1, count(PartitionRole::Efi));
                prop_assert_eq!(1, count(PartitionRole::Root));
                prop_assert!(count(PartitionRole::Swap) <= 1);
                prop_assert_eq!(PartitionRole::Efi, plan.partitions()[0].role);

                let last = plan.partitions().last().unwrap();
                prop_assert_eq!(PartitionRole::Root, last.role);
                prop_assert_eq!(PartitionSize::Remaining, last.size);
                prop_assert!(plan.fixed_bytes() + MIN_ROOT_BYTES <= d.size_bytes);
            }
        }
    }
}
