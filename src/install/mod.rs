pub mod boot;
pub mod bootstrap;
pub mod cleanup;
pub mod configure;
pub mod context;
pub mod disks;
pub mod harden;
mod map_err;
pub mod partition;
pub mod provision;
pub mod requirements;
mod stages;
pub mod target;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cleanup::Cleanup;
use context::{
    InstallContext,
    PipelineState,
};

use crate::entity::stage::StageActions;
use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

type Stage = fn(&Installer, &mut InstallContext, &mut StageActions) -> Result<(), ProvisionError>;

/// Destructive stages in execution order
const STAGES: [(&str, Stage); 6] = [
    ("partition", stages::partition),
    ("provision", stages::provision),
    ("bootstrap", stages::bootstrap),
    ("configure", stages::configure),
    ("boot", stages::boot),
    ("harden", stages::harden),
];

/// Live-environment handles shared by every stage
pub struct Installer {
    pub shell: Arc<dyn Shell>,
    pub cleanup: Cleanup,
    pub settle_delay: Duration,
    /// Transient file recording resolved partition paths
    pub bookkeeping: PathBuf,
    /// Packages installed on top of the base set
    pub extra_packages: Vec<String>,
}

impl Installer {
    /// Runs every stage against a planned `ctx` and maps stage errors to
    /// `ProvisionError::InstallError` carrying the stages performed so far.
    /// Teardown of what was mounted is left to the caller's cleanup guard.
    pub fn apply(&self, ctx: &mut InstallContext) -> Result<Box<StageActions>, ProvisionError> {
        ctx.expect_state(PipelineState::Planned)?;
        if self.cleanup.is_closed() {
            return Err(ProvisionError::Aborted("cleanup already ran".to_string()));
        }
        if ctx.mount_root != self.cleanup.mount_root() {
            return Err(ProvisionError::ProvisionBug(format!(
                "context mounts at {} but cleanup sweeps {}",
                ctx.mount_root.display(),
                self.cleanup.mount_root().display()
            )));
        }

        let mut progress: Box<StageActions> = Box::default();

        for (name, stage) in STAGES {
            tracing::info!("stage {name}: starting");

            if let Err(err) = stage(self, ctx, &mut progress) {
                tracing::error!("stage {name}: {err}");
                return Err(ProvisionError::InstallError {
                    error: Box::new(err),
                    stages_performed: progress,
                });
            }

            tracing::info!("stage {name}: done");
        }

        Ok(progress)
    }
}
