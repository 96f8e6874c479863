use super::cleanup::{
    Cleanup,
    Resource,
};
use super::map_err::map_err_configure;
use super::target::TargetContext;
use crate::constants::{
    boot,
    paths,
    services,
    USER_GROUPS,
};
use crate::edit::{
    directive,
    mkinitcpio,
    uncomment,
};
use crate::entity::action::ActionConfigure;
use crate::entity::config::{
    Secret,
    TargetConfig,
};
use crate::errors::ProvisionError;
use crate::prompt::validation::locale_gen_entry;

/// Configures the installed system from inside its own isolated context
pub struct ConfigurationApplier<'a> {
    pub target: &'a dyn TargetContext,
    pub cleanup: &'a Cleanup,
}

/// Password material for the accounts created by [`ConfigurationApplier`]
pub struct Credentials<'a> {
    pub root_password: &'a Secret,
    pub user_password: &'a Secret,
}

impl ConfigurationApplier<'_> {
    pub fn apply(
        &self,
        config: &TargetConfig,
        credentials: Credentials,
    ) -> Result<Vec<ActionConfigure>, ProvisionError> {
        let mut actions = Vec::new();

        record(
            &mut actions,
            ActionConfigure::LinkTimezone(config.timezone.clone()),
            self.link_timezone(&config.timezone),
        )?;

        record(
            &mut actions,
            ActionConfigure::HwClock,
            self.run_ok("hwclock", &["--systohc"]),
        )?;

        record(
            &mut actions,
            ActionConfigure::LocaleGen(config.locale.clone()),
            self.locale_gen(&config.locale),
        )?;

        record(
            &mut actions,
            ActionConfigure::LocaleConf,
            self.target
                .write_file("/etc/locale.conf", &format!("LANG={}\n", config.locale), Some(0o644)),
        )?;

        record(
            &mut actions,
            ActionConfigure::SetHostname(config.hostname.clone()),
            self.target
                .write_file("/etc/hostname", &format!("{}\n", config.hostname), Some(0o644)),
        )?;

        record(
            &mut actions,
            ActionConfigure::WriteHosts,
            self.target
                .write_file("/etc/hosts", &render_hosts(&config.hostname), Some(0o644)),
        )?;

        record(
            &mut actions,
            ActionConfigure::CreateUser {
                name: config.username.clone(),
                groups: USER_GROUPS.iter().map(|g| g.to_string()).collect(),
            },
            self.create_user(&config.username),
        )?;

        record(
            &mut actions,
            ActionConfigure::SetPasswords {
                users: vec!["root".to_string(), config.username.clone()],
            },
            self.set_passwords(&[
                ("root", credentials.root_password),
                (config.username.as_str(), credentials.user_password),
            ]),
        )?;

        record(&mut actions, ActionConfigure::Sudoers, self.sudoers())?;

        let mut units: Vec<&str> = services::ALWAYS.to_vec();
        if config.enable_ssh {
            units.push(services::SSH);
        }
        for unit in units {
            record(
                &mut actions,
                ActionConfigure::EnableService(unit.to_string()),
                self.run_ok("systemctl", &["enable", unit]),
            )?;
        }

        if config.enable_ssh {
            record(
                &mut actions,
                ActionConfigure::SshdConfig {
                    password_auth: config.ssh_password_auth,
                },
                self.sshd_config(config.ssh_password_auth),
            )?;
        }

        record(
            &mut actions,
            ActionConfigure::Mkinitcpio {
                hooks: boot::INITRAMFS_HOOKS.iter().map(|h| h.to_string()).collect(),
            },
            self.mkinitcpio(),
        )?;

        Ok(actions)
    }

    fn run_ok(&self, cmd: &str, args: &[&str]) -> Result<(), ProvisionError> {
        self.target.run_ok(cmd, args).map(|_| ())
    }

    fn link_timezone(&self, timezone: &str) -> Result<(), ProvisionError> {
        let zone = format!("{}/{timezone}", paths::ZONEINFO);
        self.run_ok("ln", &["-sf", &zone, "/etc/localtime"])
    }

    fn locale_gen(&self, locale: &str) -> Result<(), ProvisionError> {
        let original = self.target.read_file(paths::LOCALE_GEN).unwrap_or_default();
        let updated = uncomment::enable_line(&original, "#", &locale_gen_entry(locale));
        self.target.write_file(paths::LOCALE_GEN, &updated, Some(0o644))?;

        self.run_ok("locale-gen", &[])
    }

    fn create_user(&self, username: &str) -> Result<(), ProvisionError> {
        let groups = USER_GROUPS.join(",");
        self.run_ok("useradd", &["-m", "-G", &groups, "-s", "/bin/bash", username])
    }

    /// Only hashes reach the target, through a root-only file that is
    /// removed right after `chpasswd` reads it.
    fn set_passwords(&self, accounts: &[(&str, &Secret)]) -> Result<(), ProvisionError> {
        let content = render_chpasswd(accounts)?;
        let host_path = self.target.host_path(paths::SECRETS_FILE)?;
        let handle = self.cleanup.track(Resource::TransientFile(host_path))?;

        let script = format!("chpasswd -e < {}", paths::SECRETS_FILE);
        let result = self
            .target
            .write_file(paths::SECRETS_FILE, &content, Some(0o600))
            .and_then(|_| self.run_ok("sh", &["-c", &script]));

        // Remove the file whether or not chpasswd succeeded
        first_error(result, self.cleanup.release(handle))
    }

    fn sudoers(&self) -> Result<(), ProvisionError> {
        self.target
            .write_file(paths::SUDOERS_DROPIN, "%wheel ALL=(ALL:ALL) ALL\n", Some(0o440))?;

        self.run_ok("visudo", &["-cf", paths::SUDOERS_DROPIN])
    }

    fn sshd_config(&self, password_auth: bool) -> Result<(), ProvisionError> {
        let original = self.target.read_file(paths::SSHD_CONFIG)?;

        let password_auth = if password_auth { "yes" } else { "no" };
        let directives = [
            ("PermitRootLogin", "prohibit-password"),
            ("PubkeyAuthentication", "yes"),
            ("PasswordAuthentication", password_auth),
            ("KbdInteractiveAuthentication", "no"),
        ];

        let updated = directives
            .iter()
            .fold(original, |content, (key, value)| directive::set_directive(&content, key, value));

        for (key, value) in directives {
            if directive::get_directive(&updated, key) != Some(value) {
                return Err(ProvisionError::ProvisionBug(format!(
                    "sshd_config: {key} did not take effect"
                )));
            }
        }

        self.target.write_file(paths::SSHD_CONFIG, &updated, Some(0o644))
    }

    fn mkinitcpio(&self) -> Result<(), ProvisionError> {
        let original = self.target.read_file(paths::MKINITCPIO_CONF)?;
        let updated = mkinitcpio::set_array(&original, "HOOKS", &boot::INITRAMFS_HOOKS);
        let updated = mkinitcpio::set_array(&updated, "BINARIES", &boot::INITRAMFS_BINARIES);
        if mkinitcpio::get_array(&updated, "HOOKS")? != boot::INITRAMFS_HOOKS {
            return Err(ProvisionError::ProvisionBug(
                "mkinitcpio.conf: HOOKS rewrite did not take effect".to_string(),
            ));
        }
        self.target.write_file(paths::MKINITCPIO_CONF, &updated, Some(0o644))?;

        self.run_ok("mkinitcpio", &["-P"])
    }
}

/// A failed step wins over a failed release, which is only logged. The
/// resource stays tracked, so teardown retries the release.
fn first_error(
    result: Result<(), ProvisionError>,
    release: Result<(), ProvisionError>,
) -> Result<(), ProvisionError> {
    match (result, release) {
        (Err(err), Err(release_err)) => {
            tracing::error!("release after failed step: {release_err}");
            Err(err)
        }
        (result, release) => result.and(release),
    }
}

/// Pushes `action` onto the ledger if `result` is Ok, otherwise wraps the
/// error together with everything performed so far
fn record(
    actions: &mut Vec<ActionConfigure>,
    action: ActionConfigure,
    result: Result<(), ProvisionError>,
) -> Result<(), ProvisionError> {
    match result {
        Ok(()) => {
            tracing::info!("configure: {action:?}");
            actions.push(action);
            Ok(())
        }
        Err(err) => Err(map_err_configure(err, action, std::mem::take(actions))),
    }
}

/// `chpasswd -e` input: one `user:hash` line per account
fn render_chpasswd(accounts: &[(&str, &Secret)]) -> Result<String, ProvisionError> {
    let mut content = String::new();
    for (user, password) in accounts {
        let hash = pwhash::sha512_crypt::hash(password.expose()).map_err(|err| {
            ProvisionError::BadInput(format!("cannot hash password for {user}: {err}"))
        })?;

        content.push_str(&format!("{user}:{hash}\n"));
    }

    Ok(content)
}

fn render_hosts(hostname: &str) -> String {
    format!("127.0.0.1\tlocalhost\n::1\t\tlocalhost\n127.0.1.1\t{hostname}.localdomain\t{hostname}\n")
}
