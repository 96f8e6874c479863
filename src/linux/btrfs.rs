use std::path::Path;

use crate::errors::ProvisionError;
use crate::utils::shell::Shell;

/// Executes:
/// ```shell
/// btrfs subvolume create {top_level}/{name}
/// ```
pub fn create_subvolume(sh: &dyn Shell, top_level: &Path, name: &str) -> Result<(), ProvisionError> {
    let path = top_level.join(name);
    sh.exec("btrfs", &["subvolume", "create", &path.to_string_lossy()])
}
