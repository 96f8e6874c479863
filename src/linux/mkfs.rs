use crate::entity::plan::{
    FsType,
    PartitionSpec,
};
use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

/// Program and arguments formatting `device` as planned by `spec`. The
/// filesystem label is the partition's planned label.
pub fn create_fs_cmd(spec: &PartitionSpec, device: &str) -> (&'static str, Vec<String>) {
    let label = spec.label.clone();

    match spec.fs_type {
        FsType::Fat32 => ("mkfs.fat", vec!["-F32".into(), "-n".into(), label, device.into()]),
        FsType::Swap => ("mkswap", vec!["-L".into(), label, device.into()]),
        FsType::Btrfs => ("mkfs.btrfs", vec!["-f".into(), "-L".into(), label, device.into()]),
    }
}

/// Executes one of:
/// ```shell
/// mkfs.fat -F32 -n {label} {device}
/// mkswap -L {label} {device}
/// mkfs.btrfs -f -L {label} {device}
/// ```
pub fn create_fs(sh: &dyn Shell, spec: &PartitionSpec, device: &str) -> Result<(), ProvisionError> {
    let (cmd, args) = create_fs_cmd(spec, device);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    sh.exec(cmd, &args)
}

#[test]
fn test_create_fs_cmd() {
    let (cmd, args) = create_fs_cmd(&PartitionSpec::root(), "/dev/sda3");
    assert_eq!("mkfs.btrfs", cmd);
    assert_eq!(vec!["-f", "-L", "ROOT", "/dev/sda3"], args);

    let (cmd, args) = create_fs_cmd(&PartitionSpec::efi(1 << 30), "/dev/sda1");
    assert_eq!("mkfs.fat", cmd);
    assert_eq!(vec!["-F32", "-n", "EFI", "/dev/sda1"], args);
}

#[test]
fn test_label_follows_plan() {
    let mut spec = PartitionSpec::root();
    spec.label = "ARCH".into();

    let (_, args) = create_fs_cmd(&spec, "/dev/vda2");
    assert_eq!(vec!["-f", "-L", "ARCH", "/dev/vda2"], args);
}
