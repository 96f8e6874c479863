use serde::{
    Deserialize,
    Serialize,
};

use crate::constants::partition::*;
use crate::errors::ProvisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionRole {
    #[serde(rename = "efi")]
    Efi,
    #[serde(rename = "swap")]
    Swap,
    #[serde(rename = "root")]
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionSize {
    #[serde(rename = "fixed")]
    Fixed(u64),
    #[serde(rename = "remaining")]
    Remaining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsType {
    #[serde(rename = "vfat")]
    Fat32,
    #[serde(rename = "swap")]
    Swap,
    #[serde(rename = "btrfs")]
    Btrfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub role: PartitionRole,
    pub size: PartitionSize,
    pub fs_type: FsType,
    pub type_code: String,
    pub label: String,
}

impl PartitionSpec {
    pub fn efi(size_bytes: u64) -> Self {
        Self {
            role: PartitionRole::Efi,
            size: PartitionSize::Fixed(size_bytes),
            fs_type: FsType::Fat32,
            type_code: TYPE_CODE_EFI.to_string(),
            label: LABEL_EFI.to_string(),
        }
    }

    pub fn swap(size_bytes: u64) -> Self {
        Self {
            role: PartitionRole::Swap,
            size: PartitionSize::Fixed(size_bytes),
            fs_type: FsType::Swap,
            type_code: TYPE_CODE_SWAP.to_string(),
            label: LABEL_SWAP.to_string(),
        }
    }

    pub fn root() -> Self {
        Self {
            role: PartitionRole::Root,
            size: PartitionSize::Remaining,
            fs_type: FsType::Btrfs,
            type_code: TYPE_CODE_ROOT.to_string(),
            label: LABEL_ROOT.to_string(),
        }
    }
}

/// Ordered partition specs for one disk.
/// EFI first, optional swap, root last and consuming the rest of the disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPlan {
    partitions: Vec<PartitionSpec>,
}

impl PartitionPlan {
    pub fn new(partitions: Vec<PartitionSpec>) -> Result<Self, ProvisionError> {
        let plan = Self { partitions };
        plan.validate()?;

        Ok(plan)
    }

    pub fn partitions(&self) -> &[PartitionSpec] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// 1-based partition number of `role`, in plan order
    pub fn number_of(&self, role: PartitionRole) -> Option<usize> {
        self.partitions
            .iter()
            .position(|p| p.role == role)
            .map(|i| i + 1)
    }

    pub fn has_swap(&self) -> bool {
        self.number_of(PartitionRole::Swap).is_some()
    }

    /// Sum of all fixed-size partitions
    pub fn fixed_bytes(&self) -> u64 {
        self.partitions
            .iter()
            .map(|p| match p.size {
                PartitionSize::Fixed(b) => b,
                PartitionSize::Remaining => 0,
            })
            .sum()
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        const MSG: &str = "partition plan validation failed";

        let count = |role| self.partitions.iter().filter(|p| p.role == role).count();

        match self.partitions.first() {
            Some(p) if p.role == PartitionRole::Efi => {}
            _ => {
                return Err(ProvisionError::ProvisionBug(format!(
                    "{MSG}: EFI partition must be first"
                )));
            }
        }

        match self.partitions.last() {
            Some(p) if p.role == PartitionRole::Root && p.size == PartitionSize::Remaining => {}
            _ => {
                return Err(ProvisionError::ProvisionBug(format!(
                    "{MSG}: root partition must be last and use remaining space"
                )));
            }
        }

        if count(PartitionRole::Efi) != 1 || count(PartitionRole::Root) != 1 {
            return Err(ProvisionError::ProvisionBug(format!(
                "{MSG}: expecting exactly one EFI and one root partition"
            )));
        }

        if count(PartitionRole::Swap) > 1 {
            return Err(ProvisionError::ProvisionBug(format!(
                "{MSG}: at most one swap partition is allowed"
            )));
        }

        for p in &self.partitions {
            if p.size == PartitionSize::Fixed(0) {
                return Err(ProvisionError::ProvisionBug(format!(
                    "{MSG}: zero-sized {:?} partition",
                    p.role
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_plan_rejects_bad_order() {
        let bad_plans = vec![
            vec![PartitionSpec::root(), PartitionSpec::efi(512 * MIB)],
            vec![PartitionSpec::efi(512 * MIB)],
            vec![PartitionSpec::root()],
            vec![
                PartitionSpec::efi(512 * MIB),
                PartitionSpec::swap(MIB),
                PartitionSpec::swap(MIB),
                PartitionSpec::root(),
            ],
            vec![
                PartitionSpec::efi(512 * MIB),
                PartitionSpec::efi(512 * MIB),
                PartitionSpec::root(),
            ],
            vec![PartitionSpec::efi(0), PartitionSpec::root()],
            vec![],
        ];

        for partitions in bad_plans {
            let roles: Vec<_> = partitions.iter().map(|p| p.role).collect();
            assert!(
                PartitionPlan::new(partitions).is_err(),
                "plan {roles:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_number_of() {
        let plan = PartitionPlan::new(vec![
            PartitionSpec::efi(512 * MIB),
            PartitionSpec::swap(2048 * MIB),
            PartitionSpec::root(),
        ])
        .unwrap();

        assert_eq!(Some(1), plan.number_of(PartitionRole::Efi));
        assert_eq!(Some(2), plan.number_of(PartitionRole::Swap));
        assert_eq!(Some(3), plan.number_of(PartitionRole::Root));
        assert_eq!(2560 * MIB, plan.fixed_bytes());
        assert!(plan.has_swap());
    }
}
