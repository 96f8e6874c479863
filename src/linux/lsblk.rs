use serde::Deserialize;

use crate::entity::disk::Disk;
use crate::entity::parse_capacity;
use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

#[derive(Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Deserialize)]
struct LsblkDevice {
    name: String,
    size: Option<serde_json::Value>,
    model: Option<String>,
    #[serde(rename = "type")]
    dev_type: String,
}

/// Executes:
/// ```shell
/// lsblk -J -b -d -p -o NAME,SIZE,MODEL,TYPE
/// ```
/// and returns every whole disk, without any capacity filtering. Sizes are
/// exact byte counts, so capacity limits are not judged on rounded values.
pub fn list_disks(sh: &dyn Shell) -> Result<Vec<Disk>, ProvisionError> {
    let output = sh.output("lsblk", &["-J", "-b", "-d", "-p", "-o", "NAME,SIZE,MODEL,TYPE"])?;
    parse_disks(&output)
}

pub fn parse_disks(json: &str) -> Result<Vec<Disk>, ProvisionError> {
    let output: LsblkOutput = serde_json::from_str(json)
        .map_err(|err| ProvisionError::BadInput(format!("failed to parse lsblk output: {err}")))?;

    let mut disks = Vec::new();
    for dev in output.blockdevices {
        if dev.dev_type != "disk" {
            continue;
        }

        let device = match dev.name.starts_with('/') {
            true => dev.name,
            false => format!("/dev/{}", dev.name),
        };

        // Compressed RAM swap devices report type disk
        if device.trim_start_matches("/dev/").starts_with("zram") {
            continue;
        }

        // Older lsblk prints sizes as strings, newer may print numbers
        let size_bytes = match dev.size {
            Some(serde_json::Value::String(s)) => match s.parse::<u64>() {
                Ok(bytes) => bytes,
                Err(_) => parse_capacity(&s)?,
            },
            Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
            _ => 0,
        };

        disks.push(Disk {
            device,
            size_bytes,
            model: dev
                .model
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
        });
    }

    Ok(disks)
}
