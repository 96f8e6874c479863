use std::io::{
    BufRead,
    Write,
};
use std::path::Path;

use super::validation::*;
use super::Prompter;
use crate::constants::defaults;
use crate::entity::config::SystemConfig;
use crate::entity::disk::Disk;
use crate::entity::format_bytes;
use crate::entity::plan::{
    PartitionPlan,
    PartitionSize,
};
use crate::errors::ProvisionError;

/// Values offered to the operator as defaults
pub struct ConfigDefaults<'a> {
    pub timezone: &'a str,
    pub zoneinfo: &'a Path,
    /// Largest swap the selected disk can hold, 0 disables the swap question
    pub max_swap_gb: u64,
}

pub fn select_disk<R, W>(p: &mut Prompter<R, W>, disks: &[Disk]) -> Result<Disk, ProvisionError>
where
    R: BufRead,
    W: Write,
{
    p.say("Available disks:")?;
    let index = p.choose("Select installation disk", disks)?;

    Ok(disks[index].clone())
}

/// Collects the whole target configuration. Every answer is validated
/// before it is accepted.
pub fn collect_config<R, W>(
    p: &mut Prompter<R, W>,
    defaults: &ConfigDefaults,
) -> Result<SystemConfig, ProvisionError>
where
    R: BufRead,
    W: Write,
{
    let hostname = p.ask_valid("Hostname", None, validate_hostname)?;
    let username = p.ask_valid("Username", None, validate_username)?;
    let user_password = p.password(&format!("User {username}"))?;
    let root_password = p.password("Root")?;

    let zoneinfo = defaults.zoneinfo;
    let timezone = p.ask_valid("Timezone", Some(defaults.timezone), |tz| {
        validate_timezone(tz, zoneinfo)
    })?;
    let locale = p.ask_valid("Locale", Some(defaults::LOCALE), validate_locale)?;

    let mut enable_swap = false;
    let mut swap_size_gb = 0;
    if defaults.max_swap_gb > 0 {
        enable_swap = p.confirm("Create a swap partition?", true)?;
    }

    if enable_swap {
        let max = defaults.max_swap_gb;
        let default_size = defaults::SWAP_SIZE_GB.min(max).to_string();
        let size = p.ask_valid("Swap size in GiB", Some(&default_size), |s| {
            match s.parse::<u64>() {
                Ok(n) if (1..=max).contains(&n) => Ok(()),
                _ => Err(ProvisionError::BadInput(format!(
                    "swap size must be a whole number from 1 to {max}"
                ))),
            }
        })?;

        swap_size_gb = size
            .parse()
            .map_err(|err| ProvisionError::ProvisionBug(format!("validated swap size: {err}")))?;
    }

    let enable_ssh = p.confirm("Enable SSH server?", true)?;
    let ssh_password_auth = match enable_ssh {
        true => p.confirm(
            "Allow password login over SSH for non-root users? (root never can)",
            true,
        )?,
        false => false,
    };

    let enable_firewall = p.confirm("Enable firewall?", true)?;

    Ok(SystemConfig {
        hostname,
        username,
        user_password,
        root_password,
        timezone,
        locale,
        enable_ssh,
        ssh_password_auth,
        enable_firewall,
        enable_swap,
        swap_size_gb,
    })
}

/// Shows what is about to be destroyed and asks for explicit consent.
/// Anything but an explicit yes aborts the run.
pub fn confirm_destruction<R, W>(
    p: &mut Prompter<R, W>,
    disk: &Disk,
    plan: &PartitionPlan,
) -> Result<(), ProvisionError>
where
    R: BufRead,
    W: Write,
{
    p.say(&format!("Partition plan for {disk}:"))?;
    for (i, spec) in plan.partitions().iter().enumerate() {
        let size = match spec.size {
            PartitionSize::Fixed(bytes) => format_bytes(bytes),
            PartitionSize::Remaining => "remaining space".to_string(),
        };

        p.say(&format!(
            "  {}. {:<5} {:<16} type {} ({:?})",
            i + 1,
            spec.label,
            size,
            spec.type_code,
            spec.fs_type
        ))?;
    }

    let question = format!("ALL DATA ON {} WILL BE DESTROYED. Continue?", disk.device);
    match p.confirm(&question, false)? {
        true => Ok(()),
        false => Err(ProvisionError::Aborted(format!(
            "operator declined to erase {}",
            disk.device
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::entity::plan::PartitionSpec;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn defaults(zoneinfo: &Path, max_swap_gb: u64) -> ConfigDefaults<'_> {
        ConfigDefaults {
            timezone: "Europe/Berlin",
            zoneinfo,
            max_swap_gb,
        }
    }

    #[test]
    fn test_collect_config() {
        let input = [
            "my_host!", "my-host1", // hostname
            "Admin", "admin", // username
            "abc123", "abc123", // user password
            "rootpw1", "rootpw1", // root password
            "", // timezone default
            "", // locale default
            "y", "9", "2", // swap, size out of range then 2
            "y", "n", // ssh without password auth
            "", // firewall default yes
        ]
        .join("\n")
            + "\n";

        let missing = Path::new("/nonexistent/zoneinfo");
        let mut p = prompter(&input);
        let config = collect_config(&mut p, &defaults(missing, 8)).unwrap();

        assert_eq!("my-host1", config.hostname);
        assert_eq!("admin", config.username);
        assert_eq!("abc123", config.user_password.expose());
        assert_eq!("rootpw1", config.root_password.expose());
        assert_eq!("Europe/Berlin", config.timezone);
        assert_eq!("en_US.UTF-8", config.locale);
        assert!(config.enable_swap);
        assert_eq!(2, config.swap_size_gb);
        assert!(config.enable_ssh);
        assert!(!config.ssh_password_auth);
        assert!(config.enable_firewall);
    }

    #[test]
    fn test_collect_config_no_room_for_swap() {
        let input = ["host", "admin", "abc123", "abc123", "rootpw1", "rootpw1", "UTC", "", "n", "n"].join("\n") + "\n";

        let missing = Path::new("/nonexistent/zoneinfo");
        let mut p = prompter(&input);
        let config = collect_config(&mut p, &defaults(missing, 0)).unwrap();

        assert!(!config.enable_swap);
        assert_eq!(0, config.swap_size_gb);
        assert!(!config.enable_ssh);
        assert!(!config.ssh_password_auth);
        assert!(!config.enable_firewall);
    }

    #[test]
    fn test_confirm_destruction_defaults_to_no() {
        let disk = Disk {
            device: "/dev/sda".into(),
            size_bytes: 60 << 30,
            model: "QEMU".into(),
        };
        let plan = PartitionPlan::new(vec![PartitionSpec::efi(1 << 30), PartitionSpec::root()]).unwrap();

        for input in ["", "\n", "n\n", "whatever\n"] {
            let mut p = prompter(input);
            assert!(
                matches!(confirm_destruction(&mut p, &disk, &plan), Err(ProvisionError::Aborted(_))),
                "input {input:?}"
            );
        }

        let mut p = prompter("yes\n");
        assert!(confirm_destruction(&mut p, &disk, &plan).is_ok());
    }

    #[test]
    fn test_select_disk() {
        let disks = vec![
            Disk {
                device: "/dev/sda".into(),
                size_bytes: 60 << 30,
                model: "A".into(),
            },
            Disk {
                device: "/dev/nvme0n1".into(),
                size_bytes: 500 << 30,
                model: "B".into(),
            },
        ];

        let mut p = prompter("0\n2\n");
        assert_eq!("/dev/nvme0n1", select_disk(&mut p, &disks).unwrap().device);
    }
}
