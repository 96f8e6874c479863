use std::path::Path;

use super::map_err::map_err_boot;
use super::target::TargetContext;
use crate::constants::{
    boot,
    paths,
};
use crate::entity::action::ActionBoot;
use crate::entity::boot::{
    render_loader_conf,
    BootEntries,
};
use crate::entity::layout::MountPlan;
use crate::entity::table::PartitionTable;
use crate::errors::ProvisionError;
use crate::linux::blkid;
use crate::utils::shell::Shell;

/// Installs systemd-boot and the loader entries for the new root
pub struct BootInstaller<'a> {
    pub shell: &'a dyn Shell,
    pub target: &'a dyn TargetContext,
}

impl BootInstaller<'_> {
    /// Kernel rootflags come from `mounts`, the same plan the root subvolume
    /// was mounted with.
    pub fn install(
        &self,
        table: &PartitionTable,
        mounts: &MountPlan,
    ) -> Result<(BootEntries, Vec<ActionBoot>), ProvisionError> {
        let mut actions = Vec::new();

        let action_bootctl = ActionBoot::BootctlInstall;
        if let Err(err) = self.target.run_ok("bootctl", &["--esp-path=/boot", "install"]) {
            return Err(map_err_boot(err, action_bootctl, actions));
        }
        actions.push(action_bootctl);

        let action_loader_conf = ActionBoot::LoaderConf;
        let loader_conf = render_loader_conf(boot::ENTRY_PRIMARY, boot::LOADER_TIMEOUT);
        if let Err(err) = self.target.write_file(paths::LOADER_CONF, &loader_conf, Some(0o644)) {
            return Err(map_err_boot(err, action_loader_conf, actions));
        }
        actions.push(action_loader_conf);

        let root_part = table.root()?;
        let root_uuid = self.resolve_uuid(root_part)?;
        let entries = BootEntries::new(&root_uuid, mounts);

        for entry in entries.all() {
            let action_entry = ActionBoot::BootEntry {
                file_name: entry.file_name.clone(),
                root_uuid: root_uuid.clone(),
            };

            let path = format!("{}/{}", paths::LOADER_ENTRIES, entry.file_name);
            if let Err(err) = self.target.write_file(&path, &entry.render(), Some(0o644)) {
                return Err(map_err_boot(err, action_entry, actions));
            }

            actions.push(action_entry);
        }

        Ok((entries, actions))
    }

    /// UUID of the root filesystem, checked to lead back to `root_part`
    fn resolve_uuid(&self, root_part: &str) -> Result<String, ProvisionError> {
        let uuid = blkid::uuid_of(self.shell, root_part)?;
        let resolved = blkid::device_of_uuid(self.shell, &uuid)?;

        if !same_device(&resolved, root_part) {
            return Err(ProvisionError::ProvisionBug(format!(
                "UUID {uuid} of {root_part} resolves to {resolved}"
            )));
        }

        Ok(uuid)
    }
}

/// Compares device paths, following /dev/disk/by-* symlinks when possible
fn same_device(a: &str, b: &str) -> bool {
    match (Path::new(a).canonicalize(), Path::new(b).canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::entity::disk::Disk;
    use crate::entity::layout::{
        MountOptions,
        SubvolumeLayout,
    };
    use crate::entity::plan::{
        PartitionPlan,
        PartitionSpec,
    };
    use crate::install::target::test_utils::ScratchTarget;

    const UUID: &str = "6f1c1b4e-2d35-4a4b-9c1e-0f1e2d3c4b5a";

    fn table() -> PartitionTable {
        let disk = Disk {
            device: "/dev/nvme0n1".into(),
            size_bytes: 60 << 30,
            model: "Samsung".into(),
        };
        let plan = PartitionPlan::new(vec![PartitionSpec::efi(1 << 30), PartitionSpec::root()]).unwrap();

        PartitionTable::resolve(&disk, &plan)
    }

    fn mounts() -> MountPlan {
        MountPlan::new(
            "/dev/nvme0n1p2",
            &SubvolumeLayout::default(),
            &MountOptions::default(),
            Path::new("/mnt"),
        )
    }

    fn target_with_uuid(resolves_to: &str) -> ScratchTarget {
        let t = ScratchTarget::new();
        t.shell.respond(
            "blkid /dev/nvme0n1p2",
            &format!(r#"/dev/nvme0n1p2: LABEL="ROOT" UUID="{UUID}" TYPE="btrfs""#),
        );
        t.shell
            .respond(&format!("blkid -U {UUID}"), &format!("{resolves_to}\n"));
        t
    }

    #[test]
    fn test_install_entries() {
        let t = target_with_uuid("/dev/nvme0n1p2");
        let installer = BootInstaller {
            shell: t.shell.as_ref(),
            target: &t.target,
        };

        let (entries, actions) = installer.install(&table(), &mounts()).unwrap();
        assert_eq!(4, actions.len());
        assert_eq!(vec!["bootctl --esp-path=/boot install"], t.chroot_calls());

        assert_eq!(
            "default arch.conf\ntimeout 3\nconsole-mode max\neditor  no\n",
            t.read(paths::LOADER_CONF)
        );

        let primary = t.read("/boot/loader/entries/arch.conf");
        let fallback = t.read("/boot/loader/entries/arch-fallback.conf");
        assert_eq!(entries.primary.render(), primary);
        assert!(fallback.contains("initrd  /initramfs-linux-fallback.img\n"));
        assert!(primary.contains(&format!("root=UUID={UUID} ")));
        assert!(!primary.contains("/dev/nvme0n1p2"));
    }

    #[test]
    fn test_uuid_round_trip() {
        let t = target_with_uuid("/dev/nvme0n1p2");
        let installer = BootInstaller {
            shell: t.shell.as_ref(),
            target: &t.target,
        };

        let table = table();
        let mounts = mounts();
        let (entries, _) = installer.install(&table, &mounts).unwrap();

        for entry in entries.all() {
            let uuid = entry.root_uuid().unwrap();
            let device = blkid::device_of_uuid(t.shell.as_ref(), uuid).unwrap();

            // Same partition the root subvolume was mounted from
            assert_eq!(table.root().unwrap(), device);
            assert_eq!(mounts.root().source, device);
            assert_eq!(Some(mounts.root().options.as_str()), entry.rootflags());
        }
    }

    #[test]
    fn test_uuid_mismatch_writes_no_entries() {
        let t = target_with_uuid("/dev/sdz9");
        let installer = BootInstaller {
            shell: t.shell.as_ref(),
            target: &t.target,
        };

        let err = installer.install(&table(), &mounts()).unwrap_err();
        assert!(matches!(err, ProvisionError::ProvisionBug(_)));
        assert!(!t.exists("/boot/loader/entries/arch.conf"));
    }

    #[test]
    fn test_bootctl_failure() {
        let t = target_with_uuid("/dev/nvme0n1p2");
        t.fail("bootctl");
        let installer = BootInstaller {
            shell: t.shell.as_ref(),
            target: &t.target,
        };

        assert!(matches!(
            installer.install(&table(), &mounts()),
            Err(ProvisionError::ApplyError { .. })
        ));
        assert!(!t.exists(paths::LOADER_CONF));
    }
}
