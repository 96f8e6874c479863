use std::collections::HashSet;
use std::os::unix::process::CommandExt;
use std::process::{
    Child,
    Command,
};
use std::sync::{
    Mutex,
    MutexGuard,
};
use std::time::{
    Duration,
    Instant,
};

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{
    self,
    Signal,
};
use nix::sys::wait::{
    waitpid,
    WaitPidFlag,
    WaitStatus,
};
use nix::unistd::Pid;

static CHILDREN: Mutex<ChildRegistry> = Mutex::new(ChildRegistry::new());

/// Process groups of commands still running on behalf of the installer
#[derive(Debug)]
pub struct ChildRegistry {
    pids: Option<HashSet<u32>>,
}

impl ChildRegistry {
    pub const fn new() -> Self {
        Self { pids: None }
    }

    /// The registry used by every spawned command
    pub fn global() -> MutexGuard<'static, ChildRegistry> {
        CHILDREN.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&mut self, pid: u32) {
        tracing::debug!("registered child {pid}");
        self.pids.get_or_insert_with(HashSet::new).insert(pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        if let Some(pids) = self.pids.as_mut() {
            pids.remove(&pid);
        }
    }

    pub fn count(&self) -> usize {
        self.pids.as_ref().map_or(0, HashSet::len)
    }

    /// SIGTERMs every tracked process group, waits up to `grace` for them
    /// to exit, then SIGKILLs the rest. Exited children are reaped. Returns
    /// how many groups were signalled.
    pub fn terminate_all(&mut self, grace: Duration) -> usize {
        let pids: Vec<u32> = self.pids.take().unwrap_or_default().into_iter().collect();
        if pids.is_empty() {
            return 0;
        }

        tracing::warn!("terminating {} running command(s)", pids.len());
        for &pid in &pids {
            signal_group(pid, Signal::SIGTERM);
        }

        let start = Instant::now();
        while start.elapsed() < grace {
            if !pids.iter().any(|&pid| is_alive(pid)) {
                return pids.len();
            }

            std::thread::sleep(Duration::from_millis(50));
        }

        for &pid in pids.iter().filter(|&&pid| is_alive(pid)) {
            tracing::warn!("process group {pid} ignored SIGTERM, sending SIGKILL");
            signal_group(pid, Signal::SIGKILL);
            let _ = waitpid(Pid::from_raw(pid as i32), None);
        }

        pids.len()
    }
}

fn signal_group(pid: u32, sig: Signal) {
    // Negative pid addresses the whole group, so grandchildren such as
    // pacman under pacstrap are stopped too
    if let Err(err) = signal::kill(Pid::from_raw(-(pid as i32)), sig) {
        tracing::debug!("signal group {pid}: {err}, signalling process");
        let _ = signal::kill(Pid::from_raw(pid as i32), sig);
    }
}

/// Reaps `pid` if it already exited
fn is_alive(pid: u32) -> bool {
    match waitpid(Pid::from_raw(pid as i32), Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => true,
        Ok(_) => false,
        // Reaped elsewhere, e.g. by the thread waiting on it
        Err(Errno::ECHILD) => false,
        Err(_) => signal::kill(Pid::from_raw(pid as i32), None).is_ok(),
    }
}

pub trait CommandProcessGroup {
    /// Puts the command in its own process group and asks the kernel to
    /// SIGTERM it if the installer dies first
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        self.process_group(0);

        // SAFETY: prctl is async-signal-safe and touches no parent state
        unsafe {
            self.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }

        self
    }
}

/// Spawns `command` in its own process group and keeps it registered until
/// `wait` returns
pub fn spawn_tracked<T>(
    command: &mut Command,
    wait: impl FnOnce(Child) -> std::io::Result<T>,
) -> std::io::Result<T> {
    let child = command.in_new_process_group().spawn()?;
    let pid = child.id();
    ChildRegistry::global().register(pid);

    let result = wait(child);
    ChildRegistry::global().unregister(pid);

    result
}
