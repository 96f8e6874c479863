use std::path::Path;

use crate::constants::limits::*;
use crate::errors::ProvisionError;

/// RFC 1123 label: letters, digits and hyphens, not starting or ending with a hyphen
pub fn validate_hostname(hostname: &str) -> Result<(), ProvisionError> {
    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
        return Err(ProvisionError::BadInput(format!(
            "hostname must be 1-{MAX_HOSTNAME_LEN} characters long"
        )));
    }

    if hostname.starts_with('-') || hostname.ends_with('-') {
        return Err(ProvisionError::BadInput(
            "hostname must not start or end with a hyphen".to_string(),
        ));
    }

    if let Some(c) = hostname
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
    {
        return Err(ProvisionError::BadInput(format!(
            "hostname contains invalid character {c:?}"
        )));
    }

    Ok(())
}

/// `[a-z_][a-z0-9_-]*`, as accepted by useradd without --badname
pub fn validate_username(username: &str) -> Result<(), ProvisionError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ProvisionError::BadInput(format!(
            "username must be 1-{MAX_USERNAME_LEN} characters long"
        )));
    }

    let mut chars = username.chars();
    if let Some(first) = chars.next() {
        if !(first.is_ascii_lowercase() || first == '_') {
            return Err(ProvisionError::BadInput(
                "username must start with a lowercase letter or underscore".to_string(),
            ));
        }
    }

    if let Some(c) = chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')) {
        return Err(ProvisionError::BadInput(format!(
            "username contains invalid character {c:?}"
        )));
    }

    if username == "root" {
        return Err(ProvisionError::BadInput("username must not be root".to_string()));
    }

    Ok(())
}

pub fn validate_password_len(password: &str) -> Result<(), ProvisionError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ProvisionError::BadInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    Ok(())
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), ProvisionError> {
    validate_password_len(password)?;

    if password != confirmation {
        return Err(ProvisionError::BadInput("passwords do not match".to_string()));
    }

    Ok(())
}

/// Checks `timezone` against the zoneinfo database in `zoneinfo` when it
/// exists, and falls back to a character check otherwise.
pub fn validate_timezone(timezone: &str, zoneinfo: &Path) -> Result<(), ProvisionError> {
    let well_formed = !timezone.is_empty()
        && !timezone.starts_with('/')
        && !timezone.split('/').any(|part| part.is_empty() || part == "." || part == "..")
        && timezone
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'));

    if !well_formed {
        return Err(ProvisionError::BadInput(format!("malformed timezone {timezone}")));
    }

    if zoneinfo.is_dir() && !zoneinfo.join(timezone).is_file() {
        return Err(ProvisionError::BadInput(format!(
            "unknown timezone {timezone}: not found in {}",
            zoneinfo.display()
        )));
    }

    Ok(())
}

/// `language[_TERRITORY][.codeset][@modifier]`, e.g. en_US.UTF-8
pub fn validate_locale(locale: &str) -> Result<(), ProvisionError> {
    let bad = || ProvisionError::BadInput(format!("malformed locale {locale}"));

    let (rest, modifier) = match locale.split_once('@') {
        Some((rest, modifier)) => (rest, Some(modifier)),
        None => (locale, None),
    };
    let (rest, codeset) = match rest.split_once('.') {
        Some((rest, codeset)) => (rest, Some(codeset)),
        None => (rest, None),
    };
    let (language, territory) = match rest.split_once('_') {
        Some((language, territory)) => (language, Some(territory)),
        None => (rest, None),
    };

    if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(bad());
    }

    if let Some(territory) = territory {
        if territory.len() != 2 || !territory.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(bad());
        }
    }

    if let Some(codeset) = codeset {
        if codeset.is_empty() || !codeset.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(bad());
        }
    }

    if let Some(modifier) = modifier {
        if modifier.is_empty() || !modifier.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(bad());
        }
    }

    Ok(())
}

/// Line of /etc/locale.gen enabling `locale`
pub fn locale_gen_entry(locale: &str) -> String {
    let charmap = match locale.split_once('.') {
        Some((_, codeset)) => codeset.split('@').next().unwrap_or(codeset).to_string(),
        None => "ISO-8859-1".to_string(),
    };

    format!("{locale} {charmap}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_validate_hostname() {
        let tests = HashMap::from([
            ("my-host1", true),
            ("archlinux", true),
            ("A1", true),
            ("my_host!", false),
            ("my_host", false),
            ("-host", false),
            ("host-", false),
            ("", false),
            ("a.b", false),
        ]);

        for (hostname, valid) in tests {
            assert_eq!(valid, validate_hostname(hostname).is_ok(), "hostname {hostname}");
        }

        assert!(validate_hostname(&"a".repeat(64)).is_err());
        assert!(validate_hostname(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_validate_username() {
        let tests = HashMap::from([
            ("admin", true),
            ("_svc", true),
            ("user-01", true),
            ("Admin", false),
            ("1admin", false),
            ("ad min", false),
            ("root", false),
            ("", false),
        ]);

        for (username, valid) in tests {
            assert_eq!(valid, validate_username(username).is_ok(), "username {username}");
        }
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("abc12", "abc12").is_err());
        assert!(validate_password("abc123", "abc123").is_ok());
        assert!(validate_password("abc123", "abc124").is_err());
    }

    #[test]
    fn test_validate_timezone() {
        let zoneinfo = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(zoneinfo.path().join("Europe")).unwrap();
        std::fs::write(zoneinfo.path().join("Europe/Berlin"), "TZif").unwrap();
        std::fs::write(zoneinfo.path().join("UTC"), "TZif").unwrap();

        assert!(validate_timezone("Europe/Berlin", zoneinfo.path()).is_ok());
        assert!(validate_timezone("UTC", zoneinfo.path()).is_ok());
        assert!(validate_timezone("Europe/Atlantis", zoneinfo.path()).is_err());
        assert!(validate_timezone("Europe", zoneinfo.path()).is_err());
        assert!(validate_timezone("../../etc/passwd", zoneinfo.path()).is_err());

        // Without a zoneinfo database only the shape is checked
        let missing = zoneinfo.path().join("missing");
        assert!(validate_timezone("America/Argentina/Buenos_Aires", &missing).is_ok());
        assert!(validate_timezone("Etc/GMT+5", &missing).is_ok());
        assert!(validate_timezone("Bad Zone", &missing).is_err());
        assert!(validate_timezone("", &missing).is_err());
    }

    #[test]
    fn test_validate_locale() {
        for valid in ["en_US.UTF-8", "de_DE", "sr_RS@latin", "ast_ES.UTF-8"] {
            assert!(validate_locale(valid).is_ok(), "{valid} should be valid");
        }

        for invalid in ["", "english", "en_us.UTF-8", "EN_US", "en_US.", "en_US.UTF-8 UTF-8"] {
            assert!(validate_locale(invalid).is_err(), "{invalid} should be invalid");
        }
    }

    #[test]
    fn test_locale_gen_entry() {
        assert_eq!("en_US.UTF-8 UTF-8", locale_gen_entry("en_US.UTF-8"));
        assert_eq!("de_DE ISO-8859-1", locale_gen_entry("de_DE"));
        assert_eq!("sr_RS.UTF-8@latin UTF-8", locale_gen_entry("sr_RS.UTF-8@latin"));
    }
}
