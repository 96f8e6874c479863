use crate::entity::plan::{
    PartitionSize,
    PartitionSpec,
};
use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

/// Executes:
/// ```shell
/// wipefs -af {device}
/// ```
pub fn wipe_signatures(sh: &dyn Shell, device: &str) -> Result<(), ProvisionError> {
    sh.exec("wipefs", &["-af", device])
}

/// Destroys GPT and MBR data structures.
/// Executes:
/// ```shell
/// sgdisk -Z {device}
/// ```
pub fn zap(sh: &dyn Shell, device: &str) -> Result<(), ProvisionError> {
    sh.exec("sgdisk", &["-Z", device])
}

/// sgdisk arguments creating partition `number` from `spec`.
/// A fresh GPT is created implicitly by the first write to a zapped disk.
pub fn create_partition_args(number: usize, spec: &PartitionSpec) -> Vec<String> {
    let end = match spec.size {
        PartitionSize::Fixed(bytes) => format!("+{}K", bytes.div_ceil(1024)),
        PartitionSize::Remaining => "0".to_string(),
    };

    vec![
        "-n".to_string(),
        format!("{number}:0:{end}"),
        "-t".to_string(),
        format!("{number}:{}", spec.type_code),
        "-c".to_string(),
        format!("{number}:{}", spec.label),
    ]
}

/// Executes:
/// ```shell
/// sgdisk -n {n}:0:{end} -t {n}:{code} -c {n}:{label} {device}
/// ```
pub fn create_partition(
    sh: &dyn Shell,
    device: &str,
    number: usize,
    spec: &PartitionSpec,
) -> Result<(), ProvisionError> {
    let mut args = create_partition_args(number, spec);
    args.push(device.to_string());

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    sh.exec("sgdisk", &args)
}

/// Asks the kernel to re-read the partition table, then waits for udev
/// to finish creating the partition device nodes.
pub fn rescan(sh: &dyn Shell, device: &str) -> Result<(), ProvisionError> {
    sh.exec("partprobe", &[device])?;
    sh.exec("udevadm", &["settle"])
}

#[test]
fn test_create_partition_args() {
    let tests = [
        (
            (1, PartitionSpec::efi(1024 * 1024 * 1024)),
            "-n 1:0:+1048576K -t 1:ef00 -c 1:EFI",
        ),
        (
            (2, PartitionSpec::swap(2 * 1024 * 1024 * 1024)),
            "-n 2:0:+2097152K -t 2:8200 -c 2:SWAP",
        ),
        ((3, PartitionSpec::root()), "-n 3:0:0 -t 3:8300 -c 3:ROOT"),
    ];

    for ((number, spec), expected) in tests {
        assert_eq!(expected, create_partition_args(number, &spec).join(" "));
    }
}
