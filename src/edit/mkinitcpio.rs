use crate::errors::ProvisionError;

pub fn fmt_shell_array(arr_name: &str, arr_elems: &[&str]) -> String {
    let s = arr_elems.join(" ");

    format!("{arr_name}=({s})")
}

/// Replaces the active `NAME=(...)` line of mkinitcpio.conf with `elems`,
/// appending the array if the file has no such line.
pub fn set_array(original: &str, arr_name: &str, elems: &[&str]) -> String {
    let prefix = format!("{arr_name}=(");
    let array = fmt_shell_array(arr_name, elems);

    let mut replaced = false;
    let mut lines: Vec<String> = original
        .lines()
        .map(|line| {
            if !replaced && line.trim_start().starts_with(&prefix) {
                replaced = true;
                return array.clone();
            }

            line.to_string()
        })
        .collect();

    if !replaced {
        lines.push(array);
    }

    let mut result = lines.join("\n");
    result.push('\n');
    result
}

/// Elements of the active `NAME=(...)` array
pub fn get_array(content: &str, arr_name: &str) -> Result<Vec<String>, ProvisionError> {
    let prefix = format!("{arr_name}=(");
    let line = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(&prefix))
        .ok_or_else(|| ProvisionError::BadInput(format!("no {arr_name} array in mkinitcpio.conf")))?;

    let inner = line
        .strip_prefix(&prefix)
        .and_then(|rest| rest.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| ProvisionError::BadInput(format!("unterminated {arr_name} array: {line}")))?;

    shlex::split(inner)
        .ok_or_else(|| ProvisionError::BadInput(format!("bad {arr_name} array: {line}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONF: &str = "# vim:set ft=sh
MODULES=()
BINARIES=()
FILES=()
# HOOKS=(base udev)
HOOKS=(base udev autodetect microcode modconf kms keyboard keymap consolefont block filesystems fsck)
";

    #[test]
    fn test_fmt_shell_array() {
        assert_eq!("HOOKS=(base udev)", fmt_shell_array("HOOKS", &["base", "udev"]));
        assert_eq!("BINARIES=()", fmt_shell_array("BINARIES", &[]));
    }

    #[test]
    fn test_set_array() {
        let result = set_array(CONF, "HOOKS", &["base", "udev", "block", "filesystems"]);
        let result = set_array(&result, "BINARIES", &["btrfs"]);

        assert_eq!(
            vec!["base", "udev", "block", "filesystems"],
            get_array(&result, "HOOKS").unwrap()
        );
        assert_eq!(vec!["btrfs"], get_array(&result, "BINARIES").unwrap());
        assert!(result.contains("# HOOKS=(base udev)\n"));

        let appended = set_array("MODULES=()\n", "BINARIES", &["btrfs"]);
        assert_eq!("MODULES=()\nBINARIES=(btrfs)\n", appended);
    }
}
