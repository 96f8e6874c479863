/// Sets `key value` in a whitespace-separated config file such as
/// sshd_config.
///
/// The first line setting `key`, active or commented out, is replaced.
/// Later active duplicates are dropped. Without any such line, the directive
/// is inserted before the first `Match` block. Lines inside `Match` blocks
/// are conditional and never touched.
pub fn set_directive(original: &str, key: &str, value: &str) -> String {
    let directive = format!("{key} {value}");
    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;
    let mut match_at = None;

    for line in original.lines() {
        if match_at.is_none() && is_match_block(line) {
            match_at = Some(lines.len());
        }

        if match_at.is_some() {
            lines.push(line.to_string());
            continue;
        }

        match classify(line, key) {
            Some(_) if !replaced => {
                lines.push(directive.clone());
                replaced = true;
            }
            Some(true) => continue,
            _ => lines.push(line.to_string()),
        }
    }

    if !replaced {
        lines.insert(match_at.unwrap_or(lines.len()), directive);
    }

    let mut result = lines.join("\n");
    result.push('\n');
    result
}

/// Value of the first active `key` directive
pub fn get_directive<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content
        .lines()
        .take_while(|line| !is_match_block(line))
        .filter(|line| classify(line, key) == Some(true))
        .find_map(|line| line.trim().split_once(char::is_whitespace))
        .map(|(_, value)| value.trim())
}

/// Sets `key=value` in a shell-style assignment file such as ufw.conf,
/// replacing the first active or commented-out assignment and dropping
/// later active ones. Appends the assignment if `key` is never set.
pub fn set_assignment(original: &str, key: &str, value: &str) -> String {
    let assignment = format!("{key}={value}");
    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;

    for line in original.lines() {
        let trimmed = line.trim_start();
        let (active, rest) = match trimmed.strip_prefix('#') {
            Some(rest) => (false, rest.trim_start()),
            None => (true, trimmed),
        };

        let sets_key = rest
            .split_once('=')
            .is_some_and(|(name, _)| name.trim() == key);

        match (sets_key, active) {
            (true, _) if !replaced => {
                lines.push(assignment.clone());
                replaced = true;
            }
            (true, true) => continue,
            _ => lines.push(line.to_string()),
        }
    }

    if !replaced {
        lines.push(assignment);
    }

    let mut result = lines.join("\n");
    result.push('\n');
    result
}

fn is_match_block(line: &str) -> bool {
    line.trim_start().starts_with("Match ")
}

/// `Some(true)` if `line` sets `key`, `Some(false)` if it is a commented-out
/// setting of `key`, `None` otherwise
fn classify(line: &str, key: &str) -> Option<bool> {
    let trimmed = line.trim_start();
    let (active, rest) = match trimmed.strip_prefix('#') {
        Some(rest) => (false, rest.trim_start()),
        None => (true, trimmed),
    };

    let mut words = rest.split_whitespace();
    match words.next() {
        Some(word) if word.eq_ignore_ascii_case(key) => Some(active),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSHD_CONFIG: &str = "#Port 22
#PermitRootLogin prohibit-password
#PubkeyAuthentication yes
PasswordAuthentication yes
KbdInteractiveAuthentication no

# Example of overriding settings on a per-user basis
#Match User anoncvs
#\tX11Forwarding no
";

    #[test]
    fn test_set_directive() {
        let result = set_directive(SSHD_CONFIG, "PermitRootLogin", "prohibit-password");
        let result = set_directive(&result, "PubkeyAuthentication", "yes");
        let result = set_directive(&result, "PasswordAuthentication", "no");

        assert_eq!(Some("prohibit-password"), get_directive(&result, "PermitRootLogin"));
        assert_eq!(Some("yes"), get_directive(&result, "PubkeyAuthentication"));
        assert_eq!(Some("no"), get_directive(&result, "PasswordAuthentication"));
        assert_eq!(None, get_directive(&result, "Port"));
        assert!(result.contains("#Port 22\n"));
        assert_eq!(1, result.matches("PasswordAuthentication").count());
    }

    #[test]
    fn test_set_directive_before_match() {
        let original = "UsePAM yes\nMatch User git\n\tPasswordAuthentication no\n";
        let result = set_directive(original, "PermitRootLogin", "no");

        assert_eq!(
            "UsePAM yes\nPermitRootLogin no\nMatch User git\n\tPasswordAuthentication no\n",
            result
        );
    }

    #[test]
    fn test_match_block_untouched() {
        let original = "PasswordAuthentication yes\nMatch User git\n\tPasswordAuthentication yes\n";
        let result = set_directive(original, "PasswordAuthentication", "no");

        assert_eq!(
            "PasswordAuthentication no\nMatch User git\n\tPasswordAuthentication yes\n",
            result
        );
        assert_eq!(Some("no"), get_directive(&result, "PasswordAuthentication"));
    }

    #[test]
    fn test_set_directive_drops_duplicates() {
        let original = "PermitRootLogin yes\nPermitRootLogin without-password\n";
        assert_eq!("PermitRootLogin no\n", set_directive(original, "PermitRootLogin", "no"));
    }

    #[test]
    fn test_set_assignment() {
        let tests = [
            ("ENABLED=no\nLOGLEVEL=low\n", "ENABLED=yes\nLOGLEVEL=low\n"),
            ("#ENABLED=yes\nENABLED=no\n", "ENABLED=yes\n"),
            ("# comment\n", "# comment\nENABLED=yes\n"),
            ("", "ENABLED=yes\n"),
        ];

        for (original, expected) in tests {
            assert_eq!(expected, set_assignment(original, "ENABLED", "yes"));
        }
    }
}
