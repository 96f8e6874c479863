use std::sync::Arc;

use super::disks;
use crate::constants::{
    self,
    limits,
    net,
    paths,
};
use crate::entity::disk::Disk;
use crate::entity::parse_human_bytes;
use crate::errors::ProvisionError;
use crate::linux::{
    lsblk,
    user,
};
use crate::utils::download::Downloader;
use crate::utils::fs::file_exists;
use crate::utils::shell::{
    in_path,
    Shell,
};

/// Read-only facts about the live environment
pub trait SystemProbe {
    fn is_root(&self) -> bool;
    fn missing_commands(&self) -> Vec<String>;
    fn is_uefi(&self) -> bool;
    fn network(&self) -> Result<(), ProvisionError>;
    fn memory_bytes(&self) -> Result<u64, ProvisionError>;
    fn disks(&self) -> Result<Vec<Disk>, ProvisionError>;
}

pub struct LiveSystem {
    shell: Arc<dyn Shell>,
}

impl LiveSystem {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

impl SystemProbe for LiveSystem {
    fn is_root(&self) -> bool {
        user::is_root()
    }

    fn missing_commands(&self) -> Vec<String> {
        constants::REQUIRED_COMMANDS
            .iter()
            .filter(|cmd| !in_path(cmd))
            .map(|cmd| cmd.to_string())
            .collect()
    }

    fn is_uefi(&self) -> bool {
        file_exists(paths::EFIVARS)
    }

    fn network(&self) -> Result<(), ProvisionError> {
        Downloader::new(net::CONNECTIVITY_URL, net::PROBE_TIMEOUT)?.reachable()
    }

    fn memory_bytes(&self) -> Result<u64, ProvisionError> {
        let meminfo = std::fs::read_to_string(paths::MEMINFO)
            .map_err(|err| ProvisionError::FileError(err, paths::MEMINFO.to_string()))?;

        parse_meminfo(&meminfo)
    }

    fn disks(&self) -> Result<Vec<Disk>, ProvisionError> {
        lsblk::list_disks(self.shell.as_ref())
    }
}

/// Bytes of `MemTotal` in /proc/meminfo content
pub fn parse_meminfo(meminfo: &str) -> Result<u64, ProvisionError> {
    let line = meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .ok_or_else(|| ProvisionError::Requirement("no MemTotal in meminfo".to_string()))?;

    // MemTotal:       16316412 kB
    let kib = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ProvisionError::Requirement(format!("malformed meminfo line: {line}")))?;

    Ok(parse_human_bytes(&format!("{kib} kib"))?.size() as u64)
}

pub struct RequirementChecker<P> {
    probe: P,
    min_memory_bytes: u64,
    min_disk_bytes: u64,
}

impl<P> RequirementChecker<P>
where
    P: SystemProbe,
{
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            min_memory_bytes: limits::MIN_MEMORY_BYTES,
            min_disk_bytes: limits::MIN_DISK_BYTES,
        }
    }

    /// Runs every check in order, stopping at the first failure.
    /// Nothing is modified on the live system.
    pub fn check_all(&self) -> Result<(), ProvisionError> {
        self.check_privileges()?;
        self.check_commands()?;
        self.check_boot_mode()?;
        self.check_network()?;
        self.check_memory()?;
        self.check_disks()?;

        Ok(())
    }

    fn check_privileges(&self) -> Result<(), ProvisionError> {
        if !self.probe.is_root() {
            return Err(ProvisionError::Requirement("must run as root".to_string()));
        }

        Ok(())
    }

    fn check_commands(&self) -> Result<(), ProvisionError> {
        let missing = self.probe.missing_commands();
        if !missing.is_empty() {
            return Err(ProvisionError::Requirement(format!(
                "missing required programs: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    fn check_boot_mode(&self) -> Result<(), ProvisionError> {
        if !self.probe.is_uefi() {
            return Err(ProvisionError::Requirement(
                "system is not booted in UEFI mode".to_string(),
            ));
        }

        Ok(())
    }

    fn check_network(&self) -> Result<(), ProvisionError> {
        self.probe.network().map_err(|err| {
            ProvisionError::Requirement(format!("no network connectivity: {err}"))
        })
    }

    fn check_memory(&self) -> Result<(), ProvisionError> {
        let memory = self.probe.memory_bytes()?;
        if memory < self.min_memory_bytes {
            return Err(ProvisionError::Requirement(format!(
                "not enough memory: {memory} bytes, need {}",
                self.min_memory_bytes
            )));
        }

        Ok(())
    }

    fn check_disks(&self) -> Result<(), ProvisionError> {
        disks::require_disks(self.probe.disks()?, self.min_disk_bytes).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    struct FakeProbe {
        root: bool,
        missing: Vec<String>,
        uefi: bool,
        online: bool,
        memory: u64,
        disk_sizes: Vec<u64>,
        asked: RefCell<Vec<&'static str>>,
    }

    impl Default for FakeProbe {
        fn default() -> Self {
            Self {
                root: true,
                missing: vec![],
                uefi: true,
                online: true,
                memory: 2 * GIB,
                disk_sizes: vec![60 * GIB],
                asked: RefCell::default(),
            }
        }
    }

    impl SystemProbe for FakeProbe {
        fn is_root(&self) -> bool {
            self.asked.borrow_mut().push("root");
            self.root
        }

        fn missing_commands(&self) -> Vec<String> {
            self.asked.borrow_mut().push("commands");
            self.missing.clone()
        }

        fn is_uefi(&self) -> bool {
            self.asked.borrow_mut().push("uefi");
            self.uefi
        }

        fn network(&self) -> Result<(), ProvisionError> {
            self.asked.borrow_mut().push("network");
            match self.online {
                true => Ok(()),
                false => Err(ProvisionError::Requirement("timeout".into())),
            }
        }

        fn memory_bytes(&self) -> Result<u64, ProvisionError> {
            self.asked.borrow_mut().push("memory");
            Ok(self.memory)
        }

        fn disks(&self) -> Result<Vec<Disk>, ProvisionError> {
            self.asked.borrow_mut().push("disks");
            Ok(self
                .disk_sizes
                .iter()
                .enumerate()
                .map(|(i, size)| Disk {
                    device: format!("/dev/vd{}", (b'a' + i as u8) as char),
                    size_bytes: *size,
                    model: "virtio".into(),
                })
                .collect())
        }
    }

    #[test]
    fn test_all_checks_pass_in_order() {
        let checker = RequirementChecker::new(FakeProbe::default());
        checker.check_all().unwrap();

        assert_eq!(
            vec!["root", "commands", "uefi", "network", "memory", "disks"],
            *checker.probe.asked.borrow()
        );
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let checker = RequirementChecker::new(FakeProbe {
            uefi: false,
            ..Default::default()
        });

        let err = checker.check_all().unwrap_err();
        assert!(err.to_string().contains("UEFI"));
        assert_eq!(vec!["root", "commands", "uefi"], *checker.probe.asked.borrow());
    }

    #[test]
    fn test_each_check_fails() {
        let failing = vec![
            FakeProbe {
                root: false,
                ..Default::default()
            },
            FakeProbe {
                missing: vec!["sgdisk".into()],
                ..Default::default()
            },
            FakeProbe {
                online: false,
                ..Default::default()
            },
            FakeProbe {
                memory: GIB / 2,
                ..Default::default()
            },
            FakeProbe {
                disk_sizes: vec![4 * GIB],
                ..Default::default()
            },
            FakeProbe {
                disk_sizes: vec![],
                ..Default::default()
            },
        ];

        for probe in failing {
            assert!(RequirementChecker::new(probe).check_all().is_err());
        }
    }

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:        2048000 kB\nMemFree:          100000 kB\n";
        assert_eq!(2048000 * 1024, parse_meminfo(meminfo).unwrap());

        assert!(parse_meminfo("MemFree: 1 kB").is_err());
        assert!(parse_meminfo("MemTotal:").is_err());
    }
}
