use super::target::TargetContext;
use crate::constants::{
    packages,
    paths,
    services,
};
use crate::edit::directive;
use crate::entity::action::ActionHarden;
use crate::entity::config::TargetConfig;
use crate::errors::ProvisionError;

/// Best-effort hardening of the installed system. No step here can fail the
/// run: errors become [`ActionHarden::Warning`] entries.
pub struct SecurityHardener<'a> {
    pub target: &'a dyn TargetContext,
    /// Tells the operator about a skipped step as soon as it happens
    pub warn: fn(&str),
}

impl SecurityHardener<'_> {
    pub fn harden(&self, config: &TargetConfig) -> Vec<ActionHarden> {
        let mut actions = Vec::new();

        if config.enable_firewall {
            let result = self.firewall(config.enable_ssh);
            self.soft(&mut actions, "firewall", result, ActionHarden::Firewall {
                allow_ssh: config.enable_ssh,
            });
        }

        for unit in services::DISABLED {
            match self.disable_service(unit) {
                Ok(false) => tracing::debug!("harden: {unit} not installed"),
                Ok(true) => actions.push(ActionHarden::DisableService(unit.to_string())),
                Err(err) => self.soft(&mut actions, unit, Err(err), ActionHarden::DisableService(unit.to_string())),
            }
        }

        if config.enable_ssh {
            let result = self.bruteforce_guard();
            self.soft(&mut actions, "bruteforce-guard", result, ActionHarden::BruteforceGuard);
        }

        let home = format!("/home/{}", config.username);
        for dir in ["/root", home.as_str()] {
            let result = self.run_ok("chmod", &["700", dir]);
            self.soft(&mut actions, dir, result, ActionHarden::RestrictHome(dir.to_string()));
        }

        actions
    }

    /// Records `action` on success, a warning otherwise
    fn soft(
        &self,
        actions: &mut Vec<ActionHarden>,
        step: &str,
        result: Result<(), ProvisionError>,
        action: ActionHarden,
    ) {
        match result {
            Ok(()) => actions.push(action),
            Err(err) => {
                (self.warn)(&format!("hardening step {step} skipped: {err}"));
                actions.push(ActionHarden::Warning {
                    step: step.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    fn run_ok(&self, cmd: &str, args: &[&str]) -> Result<(), ProvisionError> {
        self.target.run_ok(cmd, args).map(|_| ())
    }

    fn install_package(&self, package: &str) -> Result<(), ProvisionError> {
        self.run_ok("pacman", &["-S", "--needed", "--noconfirm", package])
    }

    fn firewall(&self, allow_ssh: bool) -> Result<(), ProvisionError> {
        self.install_package(packages::FIREWALL)?;
        self.run_ok("ufw", &["default", "deny", "incoming"])?;
        self.run_ok("ufw", &["default", "allow", "outgoing"])?;
        if allow_ssh {
            self.run_ok("ufw", &["allow", "ssh"])?;
        }

        // ufw enable needs a running kernel, so flip the boot-time switch
        let conf = self.target.read_file(paths::UFW_CONF).unwrap_or_default();
        let conf = directive::set_assignment(&conf, "ENABLED", "yes");
        self.target.write_file(paths::UFW_CONF, &conf, Some(0o644))?;

        self.run_ok("systemctl", &["enable", services::FIREWALL])
    }

    /// Returns false if `unit` is not installed in the target
    fn disable_service(&self, unit: &str) -> Result<bool, ProvisionError> {
        let listed = self
            .target
            .run("systemctl", &["list-unit-files", "--no-legend", unit])?;

        if !listed.success() || listed.stdout.trim().is_empty() {
            return Ok(false);
        }

        self.run_ok("systemctl", &["disable", unit])?;
        Ok(true)
    }

    fn bruteforce_guard(&self) -> Result<(), ProvisionError> {
        self.install_package(packages::BRUTEFORCE_GUARD)?;
        self.target
            .write_file(paths::FAIL2BAN_JAIL, "[sshd]\nenabled = true\n", Some(0o644))?;

        self.run_ok("systemctl", &["enable", services::BRUTEFORCE_GUARD])
    }
}
