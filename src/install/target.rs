use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{
    Component,
    Path,
    PathBuf,
};
use std::sync::Arc;

use crate::errors::ProvisionError;
use crate::utils::fs::prepend_base;
use crate::utils::shell::{
    CmdOutput,
    Shell,
};

/// Acting on the installed system instead of the live environment.
/// Paths are absolute paths as seen from inside the target.
pub trait TargetContext {
    /// Target root as seen from the live environment
    fn root(&self) -> &Path;

    /// Runs `cmd` inside the target's isolated execution context.
    /// A non-zero exit is reported in the output, not as an error.
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CmdOutput, ProvisionError>;

    /// Atomically replaces `path` with `content`
    fn write_file(&self, path: &str, content: &str, mode: Option<u32>) -> Result<(), ProvisionError>;

    fn read_file(&self, path: &str) -> Result<String, ProvisionError>;

    /// Removes `path`, succeeding if it does not exist
    fn remove_file(&self, path: &str) -> Result<(), ProvisionError>;

    /// Like `run`, but a non-zero exit is an error carrying the captured log
    fn run_ok(&self, cmd: &str, args: &[&str]) -> Result<CmdOutput, ProvisionError> {
        let out = self.run(cmd, args)?;
        if !out.success() {
            return Err(ProvisionError::CmdFailed {
                error: None,
                context: format!(
                    "{cmd} in target exited with status {}: {}",
                    out.code,
                    out.log()
                ),
            });
        }

        Ok(out)
    }

    /// Live-environment path of target `path`, rejecting escapes from the root
    fn host_path(&self, path: &str) -> Result<PathBuf, ProvisionError> {
        let target_path = Path::new(path);
        let confined = target_path.is_absolute()
            && target_path
                .components()
                .all(|c| matches!(c, Component::RootDir | Component::Normal(_)));

        if !confined {
            return Err(ProvisionError::ProvisionBug(format!(
                "target path {path} must be absolute without . or .."
            )));
        }

        Ok(prepend_base(self.root(), target_path))
    }
}

/// Runs commands in the target with `arch-chroot`
pub struct ArchChroot {
    shell: Arc<dyn Shell>,
    root: PathBuf,
}

impl ArchChroot {
    pub fn new(shell: Arc<dyn Shell>, root: &Path) -> Self {
        Self {
            shell,
            root: root.to_path_buf(),
        }
    }
}

impl TargetContext for ArchChroot {
    fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, cmd: &str, args: &[&str]) -> Result<CmdOutput, ProvisionError> {
        let root = self.root.to_string_lossy();
        let mut chroot_args = vec![root.as_ref(), cmd];
        chroot_args.extend_from_slice(args);

        let out = self.shell.capture("arch-chroot", &chroot_args)?;
        tracing::debug!("target: {cmd} exited {}", out.code);
        if !out.log().is_empty() {
            tracing::debug!("target: {cmd}: {}", out.log());
        }

        Ok(out)
    }

    fn write_file(&self, path: &str, content: &str, mode: Option<u32>) -> Result<(), ProvisionError> {
        let dst = self.host_path(path)?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ProvisionError::FileError(err, format!("create directory {}", parent.display()))
            })?;
        }

        // Write next to the destination, then rename over it
        let mut tmp = dst.clone().into_os_string();
        tmp.push(".arch-provision.tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content)
            .map_err(|err| ProvisionError::FileError(err, format!("write {}", tmp.display())))?;

        if let Some(mode) = mode {
            fs::set_permissions(&tmp, fs::Permissions::from_mode(mode)).map_err(|err| {
                ProvisionError::FileError(err, format!("chmod {mode:o} {}", tmp.display()))
            })?;
        }

        fs::rename(&tmp, &dst).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            ProvisionError::FileError(err, format!("rename {} to {}", tmp.display(), dst.display()))
        })
    }

    fn read_file(&self, path: &str) -> Result<String, ProvisionError> {
        let src = self.host_path(path)?;
        fs::read_to_string(&src)
            .map_err(|err| ProvisionError::FileError(err, format!("read {}", src.display())))
    }

    fn remove_file(&self, path: &str) -> Result<(), ProvisionError> {
        let dst = self.host_path(path)?;
        match fs::remove_file(&dst) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ProvisionError::FileError(err, format!("remove {}", dst.display()))),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::test_utils::ScratchTarget;
    use super::*;

    #[test]
    fn test_write_read_remove() {
        let t = ScratchTarget::new();

        t.target
            .write_file("/etc/sudoers.d/10-wheel", "%wheel ALL=(ALL:ALL) ALL\n", Some(0o440))
            .unwrap();

        assert_eq!("%wheel ALL=(ALL:ALL) ALL\n", t.read("/etc/sudoers.d/10-wheel"));
        let mode = std::fs::metadata(t.dir.path().join("etc/sudoers.d/10-wheel"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(0o440, mode & 0o777);
        assert!(!t.exists("/etc/sudoers.d/10-wheel.arch-provision.tmp"));

        t.target.remove_file("/etc/sudoers.d/10-wheel").unwrap();
        t.target.remove_file("/etc/sudoers.d/10-wheel").unwrap();
        assert!(t.target.read_file("/etc/sudoers.d/10-wheel").is_err());
    }

    #[test]
    fn test_paths_confined_to_root() {
        let t = ScratchTarget::new();

        for bad in ["etc/hostname", "/etc/../../hostname", "../etc", ""] {
            assert!(t.target.host_path(bad).is_err(), "{bad} should be rejected");
        }

        assert_eq!(t.dir.path().join("etc/hostname"), t.target.host_path("/etc/hostname").unwrap());
    }

    #[test]
    fn test_run_in_target() {
        let t = ScratchTarget::new();
        t.fail("locale-gen");

        assert!(t.target.run_ok("hwclock", &["--systohc"]).is_ok());
        let err = t.target.run_ok("locale-gen", &[]).unwrap_err();
        assert!(err.to_string().contains("locale-gen"));

        assert_eq!(vec!["hwclock --systohc", "locale-gen"], t.chroot_calls());
    }
}
