use std::path::{
    Path,
    PathBuf,
};

use serde::Serialize;

use crate::entity::boot::BootEntries;
use crate::entity::config::SystemConfig;
use crate::entity::disk::Disk;
use crate::entity::layout::MountPlan;
use crate::entity::plan::PartitionPlan;
use crate::entity::table::PartitionTable;
use crate::errors::ProvisionError;

/// How far the pipeline got. Advances strictly one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PipelineState {
    Initialized,
    RequirementsChecked,
    Planned,
    Partitioned,
    Provisioned,
    Bootstrapped,
    Configured,
    BootInstalled,
    Hardened,
    Finalized,
}

impl PipelineState {
    pub fn next(self) -> Option<Self> {
        use PipelineState::*;

        match self {
            Initialized => Some(RequirementsChecked),
            RequirementsChecked => Some(Planned),
            Planned => Some(Partitioned),
            Partitioned => Some(Provisioned),
            Provisioned => Some(Bootstrapped),
            Bootstrapped => Some(Configured),
            Configured => Some(BootInstalled),
            BootInstalled => Some(Hardened),
            Hardened => Some(Finalized),
            Finalized => None,
        }
    }
}

/// Everything one run knows, passed explicitly to every stage
#[derive(Debug)]
pub struct InstallContext {
    pub mount_root: PathBuf,
    state: PipelineState,
    disk: Option<Disk>,
    plan: Option<PartitionPlan>,
    table: Option<PartitionTable>,
    mounts: Option<MountPlan>,
    config: Option<SystemConfig>,
    boot: Option<BootEntries>,
}

fn missing(what: &str, state: PipelineState) -> ProvisionError {
    ProvisionError::ProvisionBug(format!("no {what} yet: pipeline is at {state:?}"))
}

impl InstallContext {
    pub fn new(mount_root: &Path) -> Self {
        Self {
            mount_root: mount_root.to_path_buf(),
            state: PipelineState::Initialized,
            disk: None,
            plan: None,
            table: None,
            mounts: None,
            config: None,
            boot: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Moves to `to`, which must directly follow the current state
    pub fn advance(&mut self, to: PipelineState) -> Result<(), ProvisionError> {
        if self.state.next() != Some(to) {
            return Err(ProvisionError::ProvisionBug(format!(
                "pipeline cannot move from {:?} to {to:?}",
                self.state
            )));
        }

        tracing::debug!("pipeline: {:?} -> {to:?}", self.state);
        self.state = to;

        Ok(())
    }

    /// Errors unless the pipeline is exactly at `expected`
    pub fn expect_state(&self, expected: PipelineState) -> Result<(), ProvisionError> {
        if self.state != expected {
            return Err(ProvisionError::ProvisionBug(format!(
                "expecting pipeline at {expected:?}, but it is at {:?}",
                self.state
            )));
        }

        Ok(())
    }

    /// Records the planning outcome. Planning inputs are immutable afterwards.
    pub fn set_plan(
        &mut self,
        disk: Disk,
        plan: PartitionPlan,
        config: SystemConfig,
    ) -> Result<(), ProvisionError> {
        self.expect_state(PipelineState::RequirementsChecked)?;
        self.disk = Some(disk);
        self.plan = Some(plan);
        self.config = Some(config);

        self.advance(PipelineState::Planned)
    }

    pub fn set_table(&mut self, table: PartitionTable) -> Result<(), ProvisionError> {
        self.expect_state(PipelineState::Planned)?;
        self.table = Some(table);

        self.advance(PipelineState::Partitioned)
    }

    pub fn set_mounts(&mut self, mounts: MountPlan) -> Result<(), ProvisionError> {
        self.expect_state(PipelineState::Partitioned)?;
        self.mounts = Some(mounts);

        self.advance(PipelineState::Provisioned)
    }

    pub fn set_boot(&mut self, boot: BootEntries) -> Result<(), ProvisionError> {
        self.expect_state(PipelineState::Configured)?;
        self.boot = Some(boot);

        self.advance(PipelineState::BootInstalled)
    }

    pub fn disk(&self) -> Result<&Disk, ProvisionError> {
        self.disk.as_ref().ok_or_else(|| missing("disk", self.state))
    }

    pub fn plan(&self) -> Result<&PartitionPlan, ProvisionError> {
        self.plan.as_ref().ok_or_else(|| missing("partition plan", self.state))
    }

    pub fn table(&self) -> Result<&PartitionTable, ProvisionError> {
        self.table.as_ref().ok_or_else(|| missing("partition table", self.state))
    }

    pub fn mounts(&self) -> Result<&MountPlan, ProvisionError> {
        self.mounts.as_ref().ok_or_else(|| missing("mount plan", self.state))
    }

    pub fn config(&self) -> Result<&SystemConfig, ProvisionError> {
        self.config.as_ref().ok_or_else(|| missing("system config", self.state))
    }

    pub fn boot(&self) -> Result<&BootEntries, ProvisionError> {
        self.boot.as_ref().ok_or_else(|| missing("boot entries", self.state))
    }

    /// Drops the configuration, and with it every password
    pub fn discard_config(&mut self) {
        self.config = None;
    }
}
