use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

// For parsing Linux blkid output
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryBlkid {
    #[serde(rename = "UUID")]
    pub uuid: Option<String>,

    #[serde(rename = "PARTUUID")]
    pub part_uuid: Option<String>,

    #[serde(rename = "TYPE")]
    pub dev_type: Option<String>,

    #[serde(rename = "LABEL")]
    pub label: Option<String>,
}

/// Parses one line of `blkid <device>` output
pub fn parse_line(line: &str) -> Result<(String, EntryBlkid), ProvisionError> {
    let (dev_name, rest) = line
        .split_once(':')
        .ok_or_else(|| ProvisionError::BadInput(format!("unexpected blkid line: {line}")))?;

    // Make dev_data looks like TOML
    // KEY1=VAL1
    // KEY2=VAL2
    let dev_entry: Vec<&str> = rest.split_whitespace().collect();
    let dev_entry = dev_entry.join("\n");

    let entry: EntryBlkid = toml::from_str(&dev_entry)
        .map_err(|err| ProvisionError::BadInput(format!("failed to parse blkid output: {err}")))?;

    Ok((dev_name.trim().to_string(), entry))
}

/// Executes:
/// ```shell
/// blkid {device}
/// ```
pub fn probe(sh: &dyn Shell, device: &str) -> Result<EntryBlkid, ProvisionError> {
    let output = sh.output("blkid", &[device])?;
    let line = output
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| ProvisionError::NoSuchDevice(device.to_string()))?;

    let (_, entry) = parse_line(line)?;
    Ok(entry)
}

/// Filesystem UUID of `device`
pub fn uuid_of(sh: &dyn Shell, device: &str) -> Result<String, ProvisionError> {
    probe(sh, device)?
        .uuid
        .filter(|uuid| !uuid.is_empty())
        .ok_or_else(|| ProvisionError::NoSuchDevice(format!("{device} has no filesystem UUID")))
}

/// Executes:
/// ```shell
/// blkid -U {uuid}
/// ```
pub fn device_of_uuid(sh: &dyn Shell, uuid: &str) -> Result<String, ProvisionError> {
    let device = sh.output("blkid", &["-U", uuid])?;
    let device = device.trim();
    if device.is_empty() {
        return Err(ProvisionError::NoSuchDevice(format!("no device with UUID {uuid}")));
    }

    Ok(device.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::shell::test_utils::RecordingShell;

    const BTRFS_LINE: &str = r#"/dev/nvme0n1p3: LABEL="ROOT" UUID="6f1c1b4e-2d35-4a4b-9c1e-0f1e2d3c4b5a" UUID_SUB="aa" BLOCK_SIZE="4096" TYPE="btrfs" PARTLABEL="ROOT" PARTUUID="1c2d""#;

    #[test]
    fn test_parse_line() {
        let (dev, entry) = parse_line(BTRFS_LINE).unwrap();

        assert_eq!("/dev/nvme0n1p3", dev);
        assert_eq!(Some("btrfs"), entry.dev_type.as_deref());
        assert_eq!(Some("ROOT"), entry.label.as_deref());
        assert_eq!(
            Some("6f1c1b4e-2d35-4a4b-9c1e-0f1e2d3c4b5a"),
            entry.uuid.as_deref()
        );

        assert!(parse_line("garbage").is_err());
    }

    #[test]
    fn test_uuid_lookup() {
        let sh = RecordingShell::new();
        sh.respond("blkid /dev/nvme0n1p3", BTRFS_LINE);
        sh.respond("blkid -U 6f1c", "/dev/nvme0n1p3\n");

        assert_eq!(
            "6f1c1b4e-2d35-4a4b-9c1e-0f1e2d3c4b5a",
            uuid_of(&sh, "/dev/nvme0n1p3").unwrap()
        );
        assert_eq!("/dev/nvme0n1p3", device_of_uuid(&sh, "6f1c").unwrap());

        // Unformatted partition
        sh.respond("blkid /dev/sdb1", r#"/dev/sdb1: PARTUUID="beef""#);
        assert!(uuid_of(&sh, "/dev/sdb1").is_err());
    }
}
