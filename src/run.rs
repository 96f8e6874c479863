use std::env;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use crate::constants::{
    self,
    defaults,
    limits,
    net,
    partition,
    paths,
};
use crate::entity::report::Report;
use crate::errors::ProvisionError;
use crate::install::cleanup::Cleanup;
use crate::install::context::{
    InstallContext,
    PipelineState,
};
use crate::install::requirements::{
    LiveSystem,
    RequirementChecker,
};
use crate::install::{
    disks,
    Installer,
};
use crate::linux::lsblk;
use crate::logging;
use crate::prompt::collect::{
    collect_config,
    confirm_destruction,
    select_disk,
    ConfigDefaults,
};
use crate::prompt::validation::validate_timezone;
use crate::prompt::Prompter;
use crate::utils::download::Downloader;
use crate::utils::shell::Shell;

/// Checks requirements, collects everything from the operator, then runs
/// every destructive stage. Mounts are torn down before returning.
pub fn run(shell: Arc<dyn Shell>, cleanup: &Cleanup) -> Result<Report, ProvisionError> {
    let start = std::time::Instant::now();
    let mut ctx = InstallContext::new(cleanup.mount_root());

    logging::info("Checking requirements");
    RequirementChecker::new(LiveSystem::new(shell.clone())).check_all()?;
    ctx.advance(PipelineState::RequirementsChecked)?;

    let disks = disks::require_disks(lsblk::list_disks(shell.as_ref())?, limits::MIN_DISK_BYTES)?;

    let mut prompter = Prompter::stdio();
    let disk = select_disk(&mut prompter, &disks)?;

    let timezone = geolocate_timezone();
    let config = collect_config(
        &mut prompter,
        &ConfigDefaults {
            timezone: &timezone,
            zoneinfo: Path::new(paths::ZONEINFO),
            max_swap_gb: disks::max_swap_gb(&disk),
        },
    )?;

    let plan = disks::build_plan(&disk, config.enable_swap, config.swap_size_gb)?;
    confirm_destruction(&mut prompter, &disk, &plan)?;

    tracing::info!(
        "target: disk {disk}, host {}, user {}, ssh {}, firewall {}, swap {}",
        config.hostname,
        config.username,
        config.enable_ssh,
        config.enable_firewall,
        config.enable_swap,
    );
    ctx.set_plan(disk.clone(), plan, config)?;

    let installer = Installer {
        shell,
        cleanup: cleanup.clone(),
        settle_delay: partition::SETTLE_DELAY,
        bookkeeping: PathBuf::from(defaults::BOOKKEEPING_FILE),
        extra_packages: Vec::new(),
    };

    logging::info(&format!("Installing to {}", disk.device));
    let stages = installer.apply(&mut ctx)?;

    let root_uuid = ctx.boot().ok().map(|entries| entries.root_uuid.clone());
    ctx.discard_config();

    for resource in cleanup.teardown() {
        tracing::debug!("released {resource}");
    }
    ctx.advance(PipelineState::Finalized)?;

    Ok(Report {
        location: cleanup.mount_root().to_string_lossy().to_string(),
        disk: disk.device,
        root_uuid,
        summary: stages,
        duration: start.elapsed(),
    })
}

/// Mount root of the new system
pub fn install_location() -> PathBuf {
    env::var(constants::ENV_PROVISION_LOC)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(defaults::MOUNT_ROOT))
}

/// Best-effort timezone guess from the public IP, `UTC` on any failure
fn geolocate_timezone() -> String {
    let guessed = Downloader::new(net::GEOLOCATION_URL, net::PROBE_TIMEOUT)
        .and_then(|downloader| downloader.get_string())
        .map(|body| body.trim().to_string())
        .and_then(|tz| {
            validate_timezone(&tz, Path::new(paths::ZONEINFO))?;
            Ok(tz)
        });

    match guessed {
        Ok(tz) => tz,
        Err(err) => {
            tracing::info!("timezone lookup failed, defaulting to {}: {err}", defaults::TIMEZONE);
            defaults::TIMEZONE.to_string()
        }
    }
}
