use std::path::Path;

use super::cleanup::{
    Cleanup,
    Resource,
};
use super::map_err::map_err_provision;
use crate::constants::paths;
use crate::entity::action::ActionProvision;
use crate::entity::layout::{
    MountOptions,
    MountPlan,
    SubvolumeLayout,
};
use crate::entity::table::PartitionTable;
use crate::errors::ProvisionError;
use crate::linux::{
    btrfs,
    mount,
};
use crate::utils::fs::prepend_base;
use crate::utils::shell::Shell;

/// Creates the btrfs subvolume hierarchy and mounts the target tree
pub struct FilesystemProvisioner<'a> {
    pub shell: &'a dyn Shell,
    pub cleanup: &'a Cleanup,
}

impl FilesystemProvisioner<'_> {
    /// The order here is fixed: subvolumes can only be created on the top
    /// level, and can only be selected for mounting once they exist.
    /// Mount point directories live inside `@`, so they are created after
    /// `@` is mounted.
    pub fn provision(
        &self,
        table: &PartitionTable,
        layout: &SubvolumeLayout,
        options: &MountOptions,
        swap: bool,
    ) -> Result<(MountPlan, Vec<ActionProvision>), ProvisionError> {
        let mount_root = self.cleanup.mount_root();
        let root_part = table.root()?;
        let efi_part = table.efi()?;
        let mounts = MountPlan::new(root_part, layout, options, mount_root);

        let mut actions = Vec::new();
        let dst = mount_root.to_string_lossy().to_string();

        let action_mkdir_root = ActionProvision::MkdirMountpoint(dst.clone());
        if let Err(err) = mkdir_p(self.shell, mount_root) {
            return Err(map_err_provision(err, action_mkdir_root, actions));
        }
        actions.push(action_mkdir_root);

        // 1. Top level, no subvolume selected
        let action_mount_top = ActionProvision::MountTopLevel {
            src: root_part.to_string(),
            dst: dst.clone(),
        };
        let top_level = match mount::mount(self.shell, root_part, mount_root, None)
            .and_then(|_| self.cleanup.track(Resource::Mount(mount_root.to_path_buf())))
        {
            Ok(handle) => handle,
            Err(err) => return Err(map_err_provision(err, action_mount_top, actions)),
        };
        actions.push(action_mount_top);

        // 2. Every subvolume, exactly once
        for subvol in layout.all() {
            let action_create_subvol = ActionProvision::CreateSubvolume(subvol.name.clone());
            if let Err(err) = btrfs::create_subvolume(self.shell, mount_root, &subvol.name) {
                return Err(map_err_provision(err, action_create_subvol, actions));
            }

            actions.push(action_create_subvol);
        }

        // 3. Drop the top level mount
        let action_umount_top = ActionProvision::UnmountTopLevel(dst.clone());
        if let Err(err) = self.cleanup.release(top_level) {
            return Err(map_err_provision(err, action_umount_top, actions));
        }
        actions.push(action_umount_top);

        // 4. Root subvolume at the real mount root
        let root = mounts.root();
        self.mount_subvolume(&root.source, &root.subvolume, &root.target, &root.options, &mut actions)?;

        // 5. Mount point directories inside @
        for entry in mounts.children() {
            let action_mkdir = ActionProvision::MkdirMountpoint(entry.target.to_string_lossy().to_string());
            if let Err(err) = mkdir_p(self.shell, &entry.target) {
                return Err(map_err_provision(err, action_mkdir, actions));
            }

            actions.push(action_mkdir);
        }

        // 6. Child subvolumes. Nested mount points such as var/log vanish
        // under a freshly mounted @var, so each is ensured again right before
        // its mount.
        for entry in mounts.children() {
            let action_mkdir = ActionProvision::MkdirMountpoint(entry.target.to_string_lossy().to_string());
            if let Err(err) = mkdir_p(self.shell, &entry.target) {
                return Err(map_err_provision(err, action_mkdir, actions));
            }

            self.mount_subvolume(&entry.source, &entry.subvolume, &entry.target, &entry.options, &mut actions)?;
        }

        // 7. EFI system partition
        let boot_dir = prepend_base(mount_root, paths::BOOT_DIR);
        let action_mount_efi = ActionProvision::MountEfi {
            src: efi_part.to_string(),
            dst: boot_dir.to_string_lossy().to_string(),
        };
        if let Err(err) = mkdir_p(self.shell, &boot_dir)
            .and_then(|_| mount::mount(self.shell, efi_part, &boot_dir, None))
            .and_then(|_| self.cleanup.track(Resource::Mount(boot_dir.clone())))
        {
            return Err(map_err_provision(err, action_mount_efi, actions));
        }
        actions.push(action_mount_efi);

        // 8. Swap
        if swap {
            let swap_part = table.swap().ok_or_else(|| {
                ProvisionError::ProvisionBug("swap requested but plan has no swap partition".to_string())
            })?;

            let action_swapon = ActionProvision::SwapOn(swap_part.to_string());
            if let Err(err) = mount::swapon(self.shell, swap_part)
                .and_then(|_| self.cleanup.track(Resource::Swap(swap_part.to_string())))
            {
                return Err(map_err_provision(err, action_swapon, actions));
            }
            actions.push(action_swapon);
        }

        Ok((mounts, actions))
    }

    fn mount_subvolume(
        &self,
        src: &str,
        subvolume: &str,
        dst: &Path,
        opts: &str,
        actions: &mut Vec<ActionProvision>,
    ) -> Result<(), ProvisionError> {
        let action_mount = ActionProvision::MountSubvolume {
            src: src.to_string(),
            subvolume: subvolume.to_string(),
            dst: dst.to_string_lossy().to_string(),
            opts: opts.to_string(),
        };

        if let Err(err) = mount::mount(self.shell, src, dst, Some(opts))
            .and_then(|_| self.cleanup.track(Resource::Mount(dst.to_path_buf())))
        {
            return Err(map_err_provision(err, action_mount, std::mem::take(actions)));
        }
        actions.push(action_mount);

        Ok(())
    }
}

fn mkdir_p(sh: &dyn Shell, dir: &Path) -> Result<(), ProvisionError> {
    sh.exec("mkdir", &["-p", &dir.to_string_lossy()])
}
