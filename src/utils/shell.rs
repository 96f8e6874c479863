use std::env;
use std::fs;
use std::process::{
    Command,
    Stdio,
};

use super::process::{
    spawn_tracked,
    ChildRegistry,
};
use crate::constants::defaults;
use crate::errors::ProvisionError;

/// Exit code and captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Both streams joined, for logging
    pub fn log(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Everything the installer does to the live system goes through a `Shell`.
pub trait Shell: Send + Sync {
    /// Runs `cmd` with inherited stdio, erroring on non-zero exit
    fn exec(&self, cmd: &str, args: &[&str]) -> Result<(), ProvisionError>;

    /// Runs `cmd` with captured output. Non-zero exit is not an error here.
    fn capture(&self, cmd: &str, args: &[&str]) -> Result<CmdOutput, ProvisionError>;

    /// Runs `cmd` and returns its stdout, erroring on non-zero exit
    fn output(&self, cmd: &str, args: &[&str]) -> Result<String, ProvisionError> {
        let out = self.capture(cmd, args)?;
        if !out.success() {
            return Err(ProvisionError::CmdFailed {
                error: None,
                context: format!(
                    "command {cmd} exited with non-zero status {}: {}",
                    out.code,
                    out.stderr.trim()
                ),
            });
        }

        Ok(out.stdout)
    }

    /// Runs `cmd` and ignores any failure
    fn best_effort(&self, cmd: &str, args: &[&str]) {
        if let Err(err) = self.capture(cmd, args) {
            tracing::debug!("ignored failure of {cmd}: {err}");
        }
    }

    /// Stops every command still running, returning how many were stopped
    fn terminate_children(&self) -> usize {
        0
    }
}

/// The real live environment
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl Shell for System {
    fn exec(&self, cmd: &str, args: &[&str]) -> Result<(), ProvisionError> {
        tracing::debug!("exec: {cmd} {}", args.join(" "));

        // Nothing the installer runs reads the operator terminal, and a
        // background process group reading it would be stopped
        let mut command = Command::new(cmd);
        command.args(args).stdin(Stdio::null());

        match spawn_tracked(&mut command, |mut child| child.wait()) {
            // Spawned but may still fail
            Ok(r) => match r.code() {
                Some(0) => Ok(()),
                Some(code) => Err(ProvisionError::CmdFailed {
                    error: None,
                    context: format!("command {cmd} exited with non-zero status {code}"),
                }),
                None => Err(ProvisionError::CmdFailed {
                    error: None,
                    context: format!("command {cmd} terminated by signal"),
                }),
            },

            Err(err) => Err(ProvisionError::CmdFailed {
                error: Some(err),
                context: format!("command {cmd} failed to run"),
            }),
        }
    }

    fn capture(&self, cmd: &str, args: &[&str]) -> Result<CmdOutput, ProvisionError> {
        tracing::debug!("capture: {cmd} {}", args.join(" "));

        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = spawn_tracked(&mut command, |child| child.wait_with_output()).map_err(|err| {
            ProvisionError::CmdFailed {
                error: Some(err),
                context: format!("command {cmd} failed to run"),
            }
        })?;

        let code = output.status.code().ok_or_else(|| ProvisionError::CmdFailed {
            error: None,
            context: format!("command {cmd} terminated by signal"),
        })?;

        Ok(CmdOutput {
            code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn terminate_children(&self) -> usize {
        ChildRegistry::global().terminate_all(defaults::CHILD_GRACE)
    }
}

pub fn in_path(program: &str) -> bool {
    if let Ok(path) = env::var("PATH") {
        for p in path.split(':') {
            let p_str = format!("{}/{}", p, program);
            if fs::metadata(p_str).is_ok() {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
#[allow(unused)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{
        CmdOutput,
        Shell,
    };
    use crate::errors::ProvisionError;

    /// Recorded in place of a command line when running commands are stopped
    pub const TERMINATE_CHILDREN: &str = "<terminate children>";

    /// Records every command line and answers from canned responses.
    /// Responses are matched by the longest registered command-line prefix.
    #[derive(Default)]
    pub struct RecordingShell {
        calls: Mutex<Vec<String>>,
        responses: Mutex<HashMap<String, CmdOutput>>,
        failures: Mutex<Vec<String>>,
    }

    impl RecordingShell {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer commands starting with `prefix` with `stdout`
        pub fn respond(&self, prefix: &str, stdout: &str) -> &Self {
            self.responses.lock().unwrap().insert(
                prefix.to_string(),
                CmdOutput {
                    code: 0,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            );
            self
        }

        /// Make commands starting with `prefix` exit with status 1
        pub fn fail(&self, prefix: &str) -> &Self {
            self.failures.lock().unwrap().push(prefix.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Index of the first call starting with `prefix`
        pub fn position(&self, prefix: &str) -> Option<usize> {
            self.calls().iter().position(|c| c.starts_with(prefix))
        }

        fn answer(&self, line: &str) -> CmdOutput {
            let failures = self.failures.lock().unwrap();
            if failures.iter().any(|f| line.starts_with(f.as_str())) {
                return CmdOutput {
                    code: 1,
                    stdout: String::new(),
                    stderr: format!("{line}: simulated failure"),
                };
            }

            let responses = self.responses.lock().unwrap();
            responses
                .iter()
                .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, out)| out.clone())
                .unwrap_or_default()
        }

        fn record(&self, cmd: &str, args: &[&str]) -> String {
            let mut line = cmd.to_string();
            for arg in args {
                line.push(' ');
                line.push_str(arg);
            }

            self.calls.lock().unwrap().push(line.clone());
            line
        }
    }

    impl Shell for RecordingShell {
        fn exec(&self, cmd: &str, args: &[&str]) -> Result<(), ProvisionError> {
            let line = self.record(cmd, args);
            let out = self.answer(&line);
            if out.success() {
                return Ok(());
            }

            Err(ProvisionError::CmdFailed {
                error: None,
                context: format!("command {cmd} exited with non-zero status {}", out.code),
            })
        }

        fn capture(&self, cmd: &str, args: &[&str]) -> Result<CmdOutput, ProvisionError> {
            let line = self.record(cmd, args);
            Ok(self.answer(&line))
        }

        fn terminate_children(&self) -> usize {
            self.calls.lock().unwrap().push(TERMINATE_CHILDREN.to_string());
            0
        }
    }
}
