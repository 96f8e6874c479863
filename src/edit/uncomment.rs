use crate::errors::ProvisionError;

/// Uncomments the first line starting with `marker` and `key`, allowing up to
/// 4 spaces between marker and key.
pub fn uncomment_text_once(original: &str, marker: &str, key: &str) -> Result<String, ProvisionError> {
    for line in original.lines() {
        let trimmed = line.trim_start();
        for i in 0..5 {
            let whitespace = " ".repeat(i);
            let pattern = format!("{marker}{whitespace}{key}");

            if trimmed.starts_with(&pattern) {
                let line_uncommented = trimmed.replacen(&pattern, key, 1);
                return Ok(original.replacen(line, &line_uncommented, 1));
            }
        }
    }

    Err(ProvisionError::BadInput(format!(
        "no such comment pattern '{marker} {key}'"
    )))
}

/// Makes sure a line starting with `key` is active: uncomments it if it is
/// commented out, leaves it if already active, appends it otherwise.
pub fn enable_line(original: &str, marker: &str, key: &str) -> String {
    if original.lines().any(|line| line.trim_start().starts_with(key)) {
        return original.to_string();
    }

    if let Ok(uncommented) = uncomment_text_once(original, marker, key) {
        return uncommented;
    }

    let mut appended = original.to_string();
    if !appended.is_empty() && !appended.ends_with('\n') {
        appended.push('\n');
    }
    appended.push_str(key);
    appended.push('\n');

    appended
}
