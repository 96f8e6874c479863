pub mod collect;
pub mod validation;

use std::io::{
    self,
    BufRead,
    Stdout,
    StdinLock,
    Write,
};
use std::os::fd::AsFd;
use std::sync::{
    Mutex,
    MutexGuard,
};

use colored::Colorize;
use nix::sys::termios::{
    self,
    LocalFlags,
    SetArg,
    Termios,
};

use self::validation::{
    validate_password,
    validate_password_len,
};
use crate::entity::config::Secret;
use crate::errors::ProvisionError;

/// Line-oriented operator prompts. Invalid answers are reported and asked
/// again; end of input is never taken as an answer.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    hide_secrets: bool,
}

impl Prompter<StdinLock<'static>, Stdout> {
    /// Prompts on the controlling terminal, with echo off for secrets
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
            hide_secrets: true,
        }
    }
}

impl<R, W> Prompter<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: false,
        }
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn say(&mut self, s: &str) -> Result<(), ProvisionError> {
        writeln!(self.output, "{s}").map_err(map_io_err)
    }

    fn print(&mut self, s: &str) -> Result<(), ProvisionError> {
        write!(self.output, "{s}").map_err(map_io_err)?;
        self.output.flush().map_err(map_io_err)
    }

    fn reject(&mut self, err: &ProvisionError) -> Result<(), ProvisionError> {
        tracing::warn!("rejected input: {err}");
        let msg = format!("{err}, please try again");
        self.say(&msg.yellow().to_string())
    }

    /// Reads one line without its line terminator. `None` on end of input.
    fn read_line(&mut self) -> Result<Option<String>, ProvisionError> {
        let mut buf = String::new();
        let n = self.input.read_line(&mut buf).map_err(map_io_err)?;
        if n == 0 {
            return Ok(None);
        }

        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }

        Ok(Some(buf))
    }

    /// Asks until a non-empty answer is given. An empty answer takes `default`.
    pub fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String, ProvisionError> {
        loop {
            match default {
                Some(d) => self.print(&format!("{question} [{d}]: "))?,
                None => self.print(&format!("{question}: "))?,
            }

            let line = self
                .read_line()?
                .ok_or_else(|| ProvisionError::Aborted(format!("no answer to \"{question}\"")))?;

            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }

            match default {
                Some(d) => return Ok(d.to_string()),
                None => self.reject(&ProvisionError::BadInput("an answer is required".into()))?,
            }
        }
    }

    /// Asks until `validate` accepts the answer
    pub fn ask_valid<F>(
        &mut self,
        question: &str,
        default: Option<&str>,
        validate: F,
    ) -> Result<String, ProvisionError>
    where
        F: Fn(&str) -> Result<(), ProvisionError>,
    {
        loop {
            let answer = self.ask(question, default)?;
            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(err) => self.reject(&err)?,
            }
        }
    }

    /// Yes/no question. End of input is always "no".
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool, ProvisionError> {
        let hint = match default {
            true => "[Y/n]",
            false => "[y/N]",
        };

        loop {
            self.print(&format!("{question} {hint}: "))?;

            let line = match self.read_line()? {
                Some(line) => line,
                None => {
                    tracing::warn!("no answer to \"{question}\", assuming no");
                    return Ok(false);
                }
            };

            match line.trim().to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                other => {
                    let err = ProvisionError::BadInput(format!("expecting yes or no, got {other:?}"));
                    self.reject(&err)?;
                }
            }
        }
    }

    /// Reads a line with terminal echo disabled. Never logged.
    pub fn secret(&mut self, question: &str) -> Result<Secret, ProvisionError> {
        self.print(&format!("{question}: "))?;

        let line = {
            let _guard = match self.hide_secrets {
                true => EchoGuard::disable(Box::new(io::stdin())),
                false => None,
            };

            self.read_line()?
        };

        if self.hide_secrets {
            self.say("")?;
        }

        line.map(Secret::new)
            .ok_or_else(|| ProvisionError::Aborted(format!("no answer to \"{question}\"")))
    }

    /// Asks for a password and its confirmation until both pass validation
    pub fn password(&mut self, label: &str) -> Result<Secret, ProvisionError> {
        loop {
            let password = self.secret(&format!("{label} password"))?;
            if let Err(err) = validate_password_len(password.expose()) {
                self.reject(&err)?;
                continue;
            }

            let confirmation = self.secret(&format!("Confirm {label} password"))?;
            match validate_password(password.expose(), confirmation.expose()) {
                Ok(()) => return Ok(password),
                Err(err) => self.reject(&err)?,
            }
        }
    }

    /// Lists `items` numbered from 1 and returns the 0-based index chosen.
    /// Out-of-range answers are asked again, never clamped.
    pub fn choose<T>(&mut self, question: &str, items: &[T]) -> Result<usize, ProvisionError>
    where
        T: std::fmt::Display,
    {
        if items.is_empty() {
            return Err(ProvisionError::ProvisionBug(format!(
                "nothing to choose from for \"{question}\""
            )));
        }

        for (i, item) in items.iter().enumerate() {
            self.say(&format!("  [{}] {item}", i + 1))?;
        }

        let len = items.len();
        let answer = self.ask_valid(question, None, |s| match s.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => Ok(()),
            _ => Err(ProvisionError::BadInput(format!(
                "selection must be a number from 1 to {len}"
            ))),
        })?;

        answer
            .parse::<usize>()
            .map(|n| n - 1)
            .map_err(|err| ProvisionError::ProvisionBug(format!("validated selection: {err}")))
    }
}

fn map_io_err(err: io::Error) -> ProvisionError {
    ProvisionError::FileError(err, "operator terminal".to_string())
}

/// Terminal whose echo is currently off, with the settings to put back.
/// Kept outside the guard so an exit that never unwinds can still restore it.
static SAVED_TERMINAL: Mutex<Option<(Box<dyn AsFd + Send>, Termios)>> = Mutex::new(None);

fn saved_terminal() -> MutexGuard<'static, Option<(Box<dyn AsFd + Send>, Termios)>> {
    SAVED_TERMINAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Puts back the terminal settings saved by an active hidden prompt, if
/// any. Safe to call from any thread.
pub fn restore_echo() {
    if let Some((fd, original)) = saved_terminal().take() {
        let _ = termios::tcsetattr(fd.as_fd(), SetArg::TCSANOW, &original);
    }
}

/// Restores terminal echo when dropped
struct EchoGuard;

impl EchoGuard {
    /// `None` if `terminal` is not a terminal
    fn disable(terminal: Box<dyn AsFd + Send>) -> Option<Self> {
        let original = termios::tcgetattr(terminal.as_fd()).ok()?;

        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);

        // The slot stays locked while echo goes off, so a concurrent restore
        // waits until there is something to restore
        let mut saved = saved_terminal();
        let applied = termios::tcsetattr(terminal.as_fd(), SetArg::TCSANOW, &silent).is_ok();
        if !applied {
            return None;
        }
        *saved = Some((terminal, original));

        Some(Self)
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        restore_echo();
    }
}
