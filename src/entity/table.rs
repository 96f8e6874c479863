use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};

use super::disk::{
    Disk,
    PartitionNaming,
};
use super::plan::{
    PartitionPlan,
    PartitionRole,
};
use crate::errors::ProvisionError;

/// Concrete partition device paths after a plan was written to a disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTable {
    pub disk: String,
    pub partitions: BTreeMap<String, String>,
}

impl PartitionTable {
    /// Derives partition device paths from the disk's naming scheme
    pub fn resolve(disk: &Disk, plan: &PartitionPlan) -> Self {
        let naming = PartitionNaming::classify(&disk.device);
        let partitions = plan
            .partitions()
            .iter()
            .enumerate()
            .map(|(i, spec)| (role_key(spec.role), naming.partition(&disk.device, i + 1)))
            .collect();

        Self {
            disk: disk.device.clone(),
            partitions,
        }
    }

    pub fn get(&self, role: PartitionRole) -> Option<&str> {
        self.partitions.get(&role_key(role)).map(String::as_str)
    }

    pub fn require(&self, role: PartitionRole) -> Result<&str, ProvisionError> {
        self.get(role).ok_or_else(|| {
            ProvisionError::ProvisionBug(format!(
                "partition table for {} has no {} partition",
                self.disk,
                role_key(role)
            ))
        })
    }

    pub fn efi(&self) -> Result<&str, ProvisionError> {
        self.require(PartitionRole::Efi)
    }

    pub fn root(&self) -> Result<&str, ProvisionError> {
        self.require(PartitionRole::Root)
    }

    pub fn swap(&self) -> Option<&str> {
        self.get(PartitionRole::Swap)
    }

    pub fn to_json_string(&self) -> Result<String, ProvisionError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| ProvisionError::ProvisionBug(format!("serialize partition table: {err}")))
    }
}

fn role_key(role: PartitionRole) -> String {
    match role {
        PartitionRole::Efi => "efi",
        PartitionRole::Swap => "swap",
        PartitionRole::Root => "root",
    }
    .to_string()
}
