use std::path::{
    Path,
    PathBuf,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

use crate::errors::ProvisionError;
use crate::linux::mount;
use crate::utils::shell::Shell;
use crate::{
    logging,
    prompt,
};

/// Live-environment state that must not outlive the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Mount(PathBuf),
    Swap(String),
    TransientFile(PathBuf),
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mount(path) => write!(f, "mount {}", path.display()),
            Self::Swap(device) => write!(f, "swap {device}"),
            Self::TransientFile(path) => write!(f, "file {}", path.display()),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    outstanding: Vec<(u64, Resource)>,
    /// Set by the first teardown; nothing may be tracked afterwards
    closed: bool,
}

/// Returned for every tracked acquisition. Dropping it keeps the resource
/// tracked; only [`Cleanup::release`] or teardown releases it.
#[derive(Debug)]
#[must_use = "resources are only released early through Cleanup::release"]
pub struct ReleaseHandle {
    id: u64,
    resource: Resource,
}

impl ReleaseHandle {
    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

/// Tracks acquired resources and releases them in reverse acquisition order.
/// Clones share the same registry.
#[derive(Clone)]
pub struct Cleanup {
    shell: Arc<dyn Shell>,
    mount_root: PathBuf,
    registry: Arc<Mutex<Registry>>,
    teardown_lock: Arc<Mutex<()>>,
}

impl Cleanup {
    pub fn new(shell: Arc<dyn Shell>, mount_root: &Path) -> Self {
        Self {
            shell,
            mount_root: mount_root.to_path_buf(),
            registry: Arc::default(),
            teardown_lock: Arc::default(),
        }
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A panicking holder cannot leave the registry half-written
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records an acquired resource. Once teardown has run the resource is
    /// released on the spot and the run is aborted instead.
    pub fn track(&self, resource: Resource) -> Result<ReleaseHandle, ProvisionError> {
        let mut registry = self.registry();
        if registry.closed {
            drop(registry);
            tracing::warn!("cleanup: {resource} acquired after teardown, releasing");
            self.release_quiet(&resource);

            return Err(ProvisionError::Aborted(format!(
                "{resource} acquired after cleanup ran"
            )));
        }

        tracing::debug!("tracking {resource}");
        let id = registry.next_id;
        registry.next_id += 1;
        registry.outstanding.push((id, resource.clone()));

        Ok(ReleaseHandle { id, resource })
    }

    pub fn is_closed(&self) -> bool {
        self.registry().closed
    }

    pub fn outstanding(&self) -> Vec<Resource> {
        self.registry()
            .outstanding
            .iter()
            .map(|(_, resource)| resource.clone())
            .collect()
    }

    /// Releases one resource ahead of teardown. Errors propagate, and the
    /// resource stays tracked if releasing it failed.
    pub fn release(&self, handle: ReleaseHandle) -> Result<(), ProvisionError> {
        let still_tracked = self.registry().outstanding.iter().any(|(id, _)| *id == handle.id);
        if !still_tracked {
            return Ok(());
        }

        match &handle.resource {
            Resource::Mount(path) => mount::umount(self.shell.as_ref(), path)?,
            Resource::Swap(device) => self.shell.exec("swapoff", &[device])?,
            Resource::TransientFile(path) => remove_file(path)?,
        }

        tracing::debug!("released {}", handle.resource);
        self.registry().outstanding.retain(|(id, _)| *id != handle.id);

        Ok(())
    }

    /// Releases everything still outstanding, newest first, then unmounts
    /// anything left under the mount root. Never fails and is safe to call
    /// any number of times, from any thread. The first call closes the
    /// registry. Returns the resources released by this call.
    pub fn teardown(&self) -> Vec<Resource> {
        let _serialized = self
            .teardown_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let outstanding = {
            let mut registry = self.registry();
            registry.closed = true;
            std::mem::take(&mut registry.outstanding)
        };

        let mut released = Vec::with_capacity(outstanding.len());
        for (_, resource) in outstanding.into_iter().rev() {
            self.release_quiet(&resource);

            tracing::info!("cleanup: released {resource}");
            released.push(resource);
        }

        mount::umount_recursive_quiet(self.shell.as_ref(), &self.mount_root);

        released
    }

    fn release_quiet(&self, resource: &Resource) {
        match resource {
            Resource::Mount(path) => {
                self.shell.best_effort("umount", &[&path.to_string_lossy()]);
            }
            Resource::Swap(device) => mount::swapoff_quiet(self.shell.as_ref(), device),
            Resource::TransientFile(path) => {
                if let Err(err) = remove_file(path) {
                    tracing::warn!("cleanup: {err}");
                }
            }
        }
    }

    /// Teardown for an interrupted run. Running commands are stopped first
    /// so none keeps the mount root busy, and once more afterwards in case
    /// one was started while teardown ran.
    pub fn shutdown(&self) -> Vec<Resource> {
        let stopped = self.shell.terminate_children();
        if stopped > 0 {
            tracing::warn!("cleanup: stopped {stopped} running command(s)");
        }

        let released = self.teardown();
        self.shell.terminate_children();

        released
    }
}

fn remove_file(path: &Path) -> Result<(), ProvisionError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ProvisionError::FileError(
            err,
            format!("remove transient file {}", path.display()),
        )),
    }
}

/// Tears down every outstanding resource when dropped, which covers normal
/// completion, early returns and unwinding panics.
pub struct CleanupGuard {
    cleanup: Cleanup,
}

impl CleanupGuard {
    pub fn new(cleanup: Cleanup) -> Self {
        Self { cleanup }
    }

    pub fn cleanup(&self) -> &Cleanup {
        &self.cleanup
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        tracing::debug!("CleanupGuard dropped, tearing down");
        self.cleanup.teardown();
    }
}

/// On SIGINT, SIGTERM or SIGHUP: restores the terminal, stops running
/// commands, tears down and exits with 128 + signal number. Call this once
/// at program start.
pub fn init_signal_handlers(cleanup: Cleanup) -> Result<(), ProvisionError> {
    use signal_hook::consts::signal::{
        SIGHUP,
        SIGINT,
        SIGTERM,
    };
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
        .map_err(|err| ProvisionError::FileError(err, "register signal handlers".to_string()))?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };

            logging::warn(&format!("received {signal_name}, cleaning up"));
            std::process::exit(interrupted(&cleanup, sig));
        }
    });

    Ok(())
}

/// Everything an interrupted run does before exiting. The main thread never
/// unwinds past this point, so no destructor there runs. Returns the exit
/// code.
fn interrupted(cleanup: &Cleanup, sig: i32) -> i32 {
    prompt::restore_echo();
    cleanup.shutdown();

    128 + sig
}
