use thiserror::Error;

use crate::entity::action::Action;
use crate::entity::stage::StageActions;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("no such file {1}: {0}")]
    FileError(std::io::Error, String),

    #[error("no such device: {0}")]
    NoSuchDevice(String),

    #[error("requirement not met: {0}")]
    Requirement(String),

    #[error("no disk of at least {min_bytes} bytes found")]
    NoQualifyingDisk { min_bytes: u64 },

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("shell command failed: {context}")]
    CmdFailed {
        error: Option<std::io::Error>,
        context: String,
    },

    #[error("failed to apply {action_failed:?}: {error}")]
    ApplyError {
        error: Box<ProvisionError>,
        action_failed: Box<Action>,
        actions_performed: Vec<Action>,
    },

    #[error("installation error: {error}")]
    InstallError {
        error: Box<ProvisionError>,
        stages_performed: Box<StageActions>,
    },

    #[error("arch-provision bug: {0}")]
    ProvisionBug(String),
}

impl ProvisionError {
    /// Returns the innermost error, unwrapping `InstallError` layers
    pub fn root_cause(&self) -> &ProvisionError {
        match self {
            Self::InstallError { error, .. } => error.root_cause(),
            Self::ApplyError { error, .. } => error.root_cause(),
            err => err,
        }
    }
}

#[test]
fn test_root_cause() {
    use crate::entity::action::ActionBoot;

    let err = ProvisionError::InstallError {
        error: Box::new(ProvisionError::ApplyError {
            error: Box::new(ProvisionError::NoSuchDevice("/dev/sdz".into())),
            action_failed: Box::new(Action::Boot(ActionBoot::BootctlInstall)),
            actions_performed: vec![],
        }),
        stages_performed: Box::default(),
    };

    assert!(matches!(err.root_cause(), ProvisionError::NoSuchDevice(_)));
}
