use std::path::Path;
use std::time::Duration;

use super::cleanup::{
    Cleanup,
    Resource,
};
use super::disks;
use super::map_err::map_err_partition;
use crate::entity::action::ActionPartition;
use crate::entity::disk::Disk;
use crate::entity::plan::PartitionPlan;
use crate::entity::table::PartitionTable;
use crate::errors::ProvisionError;
use crate::linux::{
    mkfs,
    mount,
    sgdisk,
};
use crate::utils::shell::Shell;

/// Writes a fresh GPT from a plan and formats every partition
pub struct PartitionExecutor<'a> {
    pub shell: &'a dyn Shell,
    pub cleanup: &'a Cleanup,
    pub settle_delay: Duration,
    pub bookkeeping: &'a Path,
}

impl PartitionExecutor<'_> {
    /// Unmounts anything left under the mount root. Never fails, and is a
    /// no-op when nothing is mounted.
    pub fn pre_clean(&self) {
        mount::umount_recursive_quiet(self.shell, self.cleanup.mount_root());
    }

    pub fn execute(
        &self,
        disk: &Disk,
        plan: &PartitionPlan,
    ) -> Result<(PartitionTable, Vec<ActionPartition>), ProvisionError> {
        let device = disk.device.as_str();
        let mut actions = Vec::new();

        let action_reprobe = ActionPartition::ReprobeDisk {
            device: device.to_string(),
        };
        if let Err(err) = disks::verify_unchanged(self.shell, disk) {
            return Err(map_err_partition(err, action_reprobe, actions));
        }
        actions.push(action_reprobe);

        self.pre_clean();
        actions.push(ActionPartition::PreClean {
            mount_root: self.cleanup.mount_root().to_string_lossy().to_string(),
        });

        let action_wipe = ActionPartition::WipeSignatures {
            device: device.to_string(),
        };
        if let Err(err) = sgdisk::wipe_signatures(self.shell, device) {
            return Err(map_err_partition(err, action_wipe, actions));
        }
        actions.push(action_wipe);

        let action_zap = ActionPartition::ZapPartitionTable {
            device: device.to_string(),
        };
        if let Err(err) = sgdisk::zap(self.shell, device) {
            return Err(map_err_partition(err, action_zap, actions));
        }
        actions.push(action_zap);

        for (n, spec) in plan.partitions().iter().enumerate() {
            let number = n + 1;
            let action_create_partition = ActionPartition::CreatePartition {
                device: device.to_string(),
                number,
                role: spec.role,
                size: spec.size,
                type_code: spec.type_code.clone(),
            };

            if let Err(err) = sgdisk::create_partition(self.shell, device, number, spec) {
                return Err(map_err_partition(err, action_create_partition, actions));
            }

            actions.push(action_create_partition);
        }

        // Partition nodes are racy until the kernel re-scan has settled
        let action_rescan = ActionPartition::RescanPartitions {
            device: device.to_string(),
        };
        if let Err(err) = sgdisk::rescan(self.shell, device) {
            return Err(map_err_partition(err, action_rescan, actions));
        }
        std::thread::sleep(self.settle_delay);
        actions.push(action_rescan);

        let table = PartitionTable::resolve(disk, plan);

        for spec in plan.partitions() {
            let part = table.require(spec.role)?;
            let action_create_fs = ActionPartition::CreateFs {
                device: part.to_string(),
                fs_type: spec.fs_type,
            };

            if let Err(err) = mkfs::create_fs(self.shell, spec, part) {
                return Err(map_err_partition(err, action_create_fs, actions));
            }

            actions.push(action_create_fs);
        }

        let action_bookkeeping = ActionPartition::WriteBookkeeping {
            path: self.bookkeeping.to_string_lossy().to_string(),
        };
        if let Err(err) = self.write_bookkeeping(&table) {
            return Err(map_err_partition(err, action_bookkeeping, actions));
        }
        actions.push(action_bookkeeping);

        Ok((table, actions))
    }

    /// Persists resolved partition paths for the rest of this run only
    fn write_bookkeeping(&self, table: &PartitionTable) -> Result<(), ProvisionError> {
        let _handle = self
            .cleanup
            .track(Resource::TransientFile(self.bookkeeping.to_path_buf()))?;

        std::fs::write(self.bookkeeping, table.to_json_string()?).map_err(|err| {
            ProvisionError::FileError(err, format!("write {}", self.bookkeeping.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entity::plan::PartitionSpec;
    use crate::utils::shell::test_utils::RecordingShell;

    const GIB: u64 = 1024 * 1024 * 1024;
    const LSBLK: &str = r#"{"blockdevices": [{"name": "/dev/nvme0n1", "size": "60G", "model": "Samsung", "type": "disk"}]}"#;

    fn disk() -> Disk {
        Disk {
            device: "/dev/nvme0n1".into(),
            size_bytes: 60 * GIB,
            model: "Samsung".into(),
        }
    }

    fn plan() -> PartitionPlan {
        PartitionPlan::new(vec![
            PartitionSpec::efi(GIB),
            PartitionSpec::swap(2 * GIB),
            PartitionSpec::root(),
        ])
        .unwrap()
    }

    struct Setup {
        shell: Arc<RecordingShell>,
        cleanup: Cleanup,
        dir: tempfile::TempDir,
    }

    fn setup() -> Setup {
        let shell = Arc::new(RecordingShell::new());
        shell.respond("lsblk", LSBLK);
        let cleanup = Cleanup::new(shell.clone(), Path::new("/mnt"));

        Setup {
            shell,
            cleanup,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn executor<'a>(s: &'a Setup, bookkeeping: &'a Path) -> PartitionExecutor<'a> {
        PartitionExecutor {
            shell: s.shell.as_ref(),
            cleanup: &s.cleanup,
            settle_delay: Duration::ZERO,
            bookkeeping,
        }
    }

    #[test]
    fn test_execute_order() {
        let s = setup();
        let bookkeeping = s.dir.path().join("partitions.json");
        let (table, actions) = executor(&s, &bookkeeping).execute(&disk(), &plan()).unwrap();

        assert_eq!("/dev/nvme0n1p3", table.root().unwrap());

        let pos = |prefix: &str| {
            s.shell
                .position(prefix)
                .unwrap_or_else(|| panic!("{prefix} was never run"))
        };

        let ordered = [
            "lsblk",
            "umount -R /mnt",
            "wipefs -af /dev/nvme0n1",
            "sgdisk -Z /dev/nvme0n1",
            "sgdisk -n 1:0:+1048576K -t 1:ef00 -c 1:EFI /dev/nvme0n1",
            "sgdisk -n 2:0:+2097152K -t 2:8200",
            "sgdisk -n 3:0:0 -t 3:8300 -c 3:ROOT /dev/nvme0n1",
            "partprobe /dev/nvme0n1",
            "udevadm settle",
            "mkfs.fat -F32 -n EFI /dev/nvme0n1p1",
            "mkswap -L SWAP /dev/nvme0n1p2",
            "mkfs.btrfs -f -L ROOT /dev/nvme0n1p3",
        ];

        for pair in ordered.windows(2) {
            assert!(pos(pair[0]) < pos(pair[1]), "{} must run before {}", pair[0], pair[1]);
        }

        let json = std::fs::read_to_string(&bookkeeping).unwrap();
        assert!(json.contains("/dev/nvme0n1p1"));
        assert_eq!(
            vec![Resource::TransientFile(bookkeeping.clone())],
            s.cleanup.outstanding()
        );
        assert!(matches!(actions.last(), Some(ActionPartition::WriteBookkeeping { .. })));

        s.cleanup.teardown();
        assert!(!bookkeeping.exists());
    }

    #[test]
    fn test_pre_clean_idempotent() {
        let s = setup();
        s.shell.fail("umount");

        let bookkeeping = s.dir.path().join("partitions.json");
        let executor = executor(&s, &bookkeeping);
        executor.pre_clean();
        executor.pre_clean();

        assert_eq!(vec!["umount -R /mnt", "umount -R /mnt"], s.shell.calls());
    }

    #[test]
    fn test_format_failure_is_fatal() {
        let s = setup();
        s.shell.fail("mkswap");

        let bookkeeping = s.dir.path().join("partitions.json");
        let err = executor(&s, &bookkeeping).execute(&disk(), &plan()).unwrap_err();

        match err {
            ProvisionError::ApplyError {
                action_failed,
                actions_performed,
                ..
            } => {
                assert!(format!("{action_failed:?}").contains("CreateFs"));
                assert!(!actions_performed.is_empty());
            }
            err => panic!("unexpected error {err}"),
        }

        assert_eq!(None, s.shell.position("mkfs.btrfs"));
        assert!(!bookkeeping.exists());
    }

    #[test]
    fn test_changed_disk_untouched() {
        let s = setup();
        let bookkeeping = s.dir.path().join("partitions.json");

        let mut other = disk();
        other.model = "Different".into();

        assert!(executor(&s, &bookkeeping).execute(&other, &plan()).is_err());
        assert_eq!(vec!["lsblk -J -d -p -o NAME,SIZE,MODEL,TYPE"], s.shell.calls());
    }
}
