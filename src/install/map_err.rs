use crate::entity::action::{
    Action,
    ActionBoot,
    ActionBootstrap,
    ActionConfigure,
    ActionPartition,
    ActionProvision,
};
use crate::errors::ProvisionError;

pub(super) fn map_err_partition(
    err: ProvisionError,
    action_failed: ActionPartition,
    actions_performed: Vec<ActionPartition>,
) -> ProvisionError {
    ProvisionError::ApplyError {
        error: Box::new(err),
        action_failed: Box::new(Action::Partition(action_failed)),
        actions_performed: actions_performed
            .into_iter()
            .map(Action::Partition)
            .collect(),
    }
}

pub(super) fn map_err_provision(
    err: ProvisionError,
    action_failed: ActionProvision,
    actions_performed: Vec<ActionProvision>,
) -> ProvisionError {
    ProvisionError::ApplyError {
        error: Box::new(err),
        action_failed: Box::new(Action::Provision(action_failed)),
        actions_performed: actions_performed
            .into_iter()
            .map(Action::Provision)
            .collect(),
    }
}

pub(super) fn map_err_bootstrap(
    err: ProvisionError,
    action_failed: ActionBootstrap,
    actions_performed: Vec<ActionBootstrap>,
) -> ProvisionError {
    ProvisionError::ApplyError {
        error: Box::new(err),
        action_failed: Box::new(Action::Bootstrap(action_failed)),
        actions_performed: actions_performed
            .into_iter()
            .map(Action::Bootstrap)
            .collect(),
    }
}

pub(super) fn map_err_configure(
    err: ProvisionError,
    action_failed: ActionConfigure,
    actions_performed: Vec<ActionConfigure>,
) -> ProvisionError {
    ProvisionError::ApplyError {
        error: Box::new(err),
        action_failed: Box::new(Action::Configure(action_failed)),
        actions_performed: actions_performed
            .into_iter()
            .map(Action::Configure)
            .collect(),
    }
}

pub(super) fn map_err_boot(
    err: ProvisionError,
    action_failed: ActionBoot,
    actions_performed: Vec<ActionBoot>,
) -> ProvisionError {
    ProvisionError::ApplyError {
        error: Box::new(err),
        action_failed: Box::new(Action::Boot(action_failed)),
        actions_performed: actions_performed.into_iter().map(Action::Boot).collect(),
    }
}
