use std::path::Path;

use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

/// Executes:
/// ```shell
/// mount [-o {opts}] {device} {dst}
/// ```
pub fn mount(
    sh: &dyn Shell,
    device: &str,
    dst: &Path,
    opts: Option<&str>,
) -> Result<(), ProvisionError> {
    let dst = dst.to_string_lossy();
    match opts {
        Some(opts) => sh.exec("mount", &["-o", opts, device, &dst]),
        None => sh.exec("mount", &[device, &dst]),
    }
}

pub fn umount(sh: &dyn Shell, dst: &Path) -> Result<(), ProvisionError> {
    sh.exec("umount", &[&dst.to_string_lossy()])
}

/// Unmounts everything under `dst`, ignoring errors
pub fn umount_recursive_quiet(sh: &dyn Shell, dst: &Path) {
    sh.best_effort("umount", &["-R", &dst.to_string_lossy()]);
}

pub fn swapon(sh: &dyn Shell, device: &str) -> Result<(), ProvisionError> {
    sh.exec("swapon", &[device])
}

pub fn swapoff_quiet(sh: &dyn Shell, device: &str) {
    sh.best_effort("swapoff", &[device]);
}

#[test]
fn test_mount_args() {
    use crate::utils::shell::test_utils::RecordingShell;

    let sh = RecordingShell::new();
    mount(&sh, "/dev/sda3", Path::new("/mnt"), Some("subvol=@")).unwrap();
    mount(&sh, "/dev/sda1", Path::new("/mnt/boot"), None).unwrap();
    umount_recursive_quiet(&sh, Path::new("/mnt"));

    assert_eq!(
        vec![
            "mount -o subvol=@ /dev/sda3 /mnt",
            "mount /dev/sda1 /mnt/boot",
            "umount -R /mnt"
        ],
        sh.calls()
    );
}
