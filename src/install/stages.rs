use super::boot::BootInstaller;
use super::bootstrap::{
    package_set,
    BaseSystemInstaller,
};
use super::configure::{
    ConfigurationApplier,
    Credentials,
};
use super::context::{
    InstallContext,
    PipelineState,
};
use super::harden::SecurityHardener;
use super::partition::PartitionExecutor;
use super::provision::FilesystemProvisioner;
use super::target::ArchChroot;
use super::Installer;
use crate::entity::config::TargetConfig;
use crate::entity::layout::{
    MountOptions,
    SubvolumeLayout,
};
use crate::entity::stage::StageActions;
use crate::errors::ProvisionError;
use crate::logging;

/// Wipe the selected disk, write the planned GPT and format every partition
pub fn partition(
    installer: &Installer,
    ctx: &mut InstallContext,
    stages: &mut StageActions,
) -> Result<(), ProvisionError> {
    let executor = PartitionExecutor {
        shell: installer.shell.as_ref(),
        cleanup: &installer.cleanup,
        settle_delay: installer.settle_delay,
        bookkeeping: &installer.bookkeeping,
    };

    let (table, actions) = executor.execute(ctx.disk()?, ctx.plan()?)?;
    stages.partition.extend(actions);

    ctx.set_table(table)
}

/// Create subvolumes and mount the target tree on live system
pub fn provision(
    installer: &Installer,
    ctx: &mut InstallContext,
    stages: &mut StageActions,
) -> Result<(), ProvisionError> {
    let provisioner = FilesystemProvisioner {
        shell: installer.shell.as_ref(),
        cleanup: &installer.cleanup,
    };

    let (mounts, actions) = provisioner.provision(
        ctx.table()?,
        &SubvolumeLayout::default(),
        &MountOptions::default(),
        ctx.plan()?.has_swap(),
    )?;
    stages.provision.extend(actions);

    ctx.set_mounts(mounts)
}

/// Install packages and generate fstab
pub fn bootstrap(
    installer: &Installer,
    ctx: &mut InstallContext,
    stages: &mut StageActions,
) -> Result<(), ProvisionError> {
    ctx.expect_state(PipelineState::Provisioned)?;

    let target = ArchChroot::new(installer.shell.clone(), &ctx.mount_root);
    let config = TargetConfig::from(ctx.config()?);
    let pkgs = package_set(&config, installer.extra_packages.iter().map(String::as_str));

    let base = BaseSystemInstaller {
        shell: installer.shell.as_ref(),
        target: &target,
    };
    let actions = base.install(&pkgs)?;
    stages.bootstrap.extend(actions);

    ctx.advance(PipelineState::Bootstrapped)
}

/// Configure the new system from inside arch-chroot
pub fn configure(
    installer: &Installer,
    ctx: &mut InstallContext,
    stages: &mut StageActions,
) -> Result<(), ProvisionError> {
    ctx.expect_state(PipelineState::Bootstrapped)?;

    let target = ArchChroot::new(installer.shell.clone(), &ctx.mount_root);
    let config = ctx.config()?;

    let applier = ConfigurationApplier {
        target: &target,
        cleanup: &installer.cleanup,
    };
    let actions = applier.apply(
        &TargetConfig::from(config),
        Credentials {
            root_password: &config.root_password,
            user_password: &config.user_password,
        },
    )?;
    stages.configure.extend(actions);

    ctx.advance(PipelineState::Configured)
}

/// Install the boot manager and loader entries
pub fn boot(
    installer: &Installer,
    ctx: &mut InstallContext,
    stages: &mut StageActions,
) -> Result<(), ProvisionError> {
    let target = ArchChroot::new(installer.shell.clone(), &ctx.mount_root);
    let boot_installer = BootInstaller {
        shell: installer.shell.as_ref(),
        target: &target,
    };

    let (entries, actions) = boot_installer.install(ctx.table()?, ctx.mounts()?)?;
    stages.boot.extend(actions);

    ctx.set_boot(entries)
}

/// Best-effort hardening. Only a broken pipeline precondition can fail here.
pub fn harden(
    installer: &Installer,
    ctx: &mut InstallContext,
    stages: &mut StageActions,
) -> Result<(), ProvisionError> {
    ctx.expect_state(PipelineState::BootInstalled)?;

    let target = ArchChroot::new(installer.shell.clone(), &ctx.mount_root);
    let config = TargetConfig::from(ctx.config()?);

    let hardener = SecurityHardener {
        target: &target,
        warn: logging::warn,
    };
    let actions = hardener.harden(&config);
    stages.harden.extend(actions);

    ctx.advance(PipelineState::Hardened)
}
