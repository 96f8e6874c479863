use std::path::{
    Path,
    PathBuf,
};

pub fn file_exists<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref().exists()
}

/// Joins `path` under `base`, treating an absolute `path` as relative to `base`.
/// e.g. base /mnt on /etc/hostname => /mnt/etc/hostname
pub fn prepend_base<P>(base: &Path, path: P) -> PathBuf
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let relative = path.strip_prefix("/").unwrap_or(path);

    if relative.as_os_str().is_empty() {
        return base.to_path_buf();
    }

    base.join(relative)
}

#[test]
fn test_prepend_base() {
    let base = Path::new("/mnt");
    let tests = [
        ("/etc/hostname", "/mnt/etc/hostname"),
        ("etc/hostname", "/mnt/etc/hostname"),
        ("/", "/mnt"),
        ("", "/mnt"),
        ("var/log", "/mnt/var/log"),
    ];

    for (path, expected) in tests {
        assert_eq!(PathBuf::from(expected), prepend_base(base, path));
    }
}
