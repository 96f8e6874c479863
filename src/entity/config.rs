use serde::{
    Deserialize,
    Serialize,
};

/// Password material. Never serialized, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        // Overwrite before the allocation is released
        let len = self.0.len();
        self.0.clear();
        self.0.extend(std::iter::repeat('\0').take(len));
    }
}

/// Operator-supplied target state, collected once before any destructive step
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub hostname: String,
    pub username: String,
    pub user_password: Secret,
    pub root_password: Secret,
    pub timezone: String,
    pub locale: String,
    pub enable_ssh: bool,
    pub ssh_password_auth: bool,
    pub enable_firewall: bool,
    pub enable_swap: bool,
    pub swap_size_gb: u64,
}

/// `SystemConfig` minus secrets, handed to the target context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub hostname: String,
    pub username: String,
    pub timezone: String,
    pub locale: String,
    pub enable_ssh: bool,
    pub ssh_password_auth: bool,
    pub enable_firewall: bool,
}

impl From<&SystemConfig> for TargetConfig {
    fn from(c: &SystemConfig) -> Self {
        Self {
            hostname: c.hostname.clone(),
            username: c.username.clone(),
            timezone: c.timezone.clone(),
            locale: c.locale.clone(),
            enable_ssh: c.enable_ssh,
            ssh_password_auth: c.ssh_password_auth,
            enable_firewall: c.enable_firewall,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> SystemConfig {
    SystemConfig {
        hostname: "my-host1".into(),
        username: "admin".into(),
        user_password: Secret::new("abc123".into()),
        root_password: Secret::new("rootpw1".into()),
        timezone: "Europe/Berlin".into(),
        locale: "en_US.UTF-8".into(),
        enable_ssh: true,
        ssh_password_auth: true,
        enable_firewall: true,
        enable_swap: true,
        swap_size_gb: 2,
    }
}

#[test]
fn test_secrets_never_leak() {
    let config = test_config();

    let debug = format!("{config:?}");
    assert!(!debug.contains("abc123"));
    assert!(!debug.contains("rootpw1"));

    let json = serde_json::to_string(&TargetConfig::from(&config)).unwrap();
    assert!(!json.contains("abc123"));
    assert!(json.contains("\"hostname\":\"my-host1\""));
}
