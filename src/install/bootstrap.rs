use std::collections::BTreeSet;

use super::map_err::map_err_bootstrap;
use super::target::TargetContext;
use crate::constants::{
    btrfs,
    packages,
};
use crate::edit::fstab;
use crate::entity::action::ActionBootstrap;
use crate::entity::config::TargetConfig;
use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

const FSTAB: &str = "/etc/fstab";

/// Base packages plus whatever `config` needs, plus `extra`
pub fn package_set<'a, I>(config: &TargetConfig, extra: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut pkgs: BTreeSet<String> = packages::BASE.iter().map(|p| p.to_string()).collect();

    if config.enable_ssh {
        pkgs.insert(packages::SSH.to_string());
    }

    pkgs.extend(extra.into_iter().map(str::to_string));
    pkgs
}

/// Bootstraps the base system into the mounted target and writes its fstab
pub struct BaseSystemInstaller<'a> {
    pub shell: &'a dyn Shell,
    pub target: &'a dyn TargetContext,
}

impl BaseSystemInstaller<'_> {
    pub fn install(&self, pkgs: &BTreeSet<String>) -> Result<Vec<ActionBootstrap>, ProvisionError> {
        let mut actions = Vec::new();
        let mount_root = self.target.root().to_string_lossy().to_string();

        let action_pacstrap = ActionBootstrap::InstallPackages {
            packages: pkgs.clone(),
        };
        let mut args = vec!["-K", mount_root.as_str()];
        args.extend(pkgs.iter().map(String::as_str));
        if let Err(err) = self.shell.exec("pacstrap", &args) {
            return Err(map_err_bootstrap(err, action_pacstrap, actions));
        }
        actions.push(action_pacstrap);

        let generated = match self.shell.output("genfstab", &["-U", &mount_root]) {
            Ok(generated) => generated,
            Err(err) => return Err(map_err_bootstrap(err, ActionBootstrap::GenFstab, actions)),
        };
        actions.push(ActionBootstrap::GenFstab);

        let action_rewrite = ActionBootstrap::RewriteFstabAtime(btrfs::ATIME.to_string());
        if let Err(err) = self.write_fstab(&generated) {
            return Err(map_err_bootstrap(err, action_rewrite, actions));
        }
        actions.push(action_rewrite);

        Ok(actions)
    }

    fn write_fstab(&self, generated: &str) -> Result<(), ProvisionError> {
        let bad_sources = fstab::non_uuid_sources(generated);
        if !bad_sources.is_empty() {
            return Err(ProvisionError::ProvisionBug(format!(
                "genfstab emitted entries not referenced by UUID: {}",
                bad_sources.join(", ")
            )));
        }

        let rewritten = fstab::rewrite_atime(generated, btrfs::ATIME);

        // pacstrap ships a comment-only fstab
        let mut content = self.target.read_file(FSTAB).unwrap_or_default();
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&rewritten);

        self.target.write_file(FSTAB, &content, Some(0o644))
    }
}
