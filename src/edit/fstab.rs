/// Replaces the `relatime` access-time option of every fstab entry with
/// `atime`, leaving comments and other options untouched.
pub fn rewrite_atime(fstab: &str, atime: &str) -> String {
    let mut result: String = fstab
        .lines()
        .map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if line.trim_start().starts_with('#') || fields.len() < 4 {
                return line.to_string();
            }

            let opts = fields[3];
            let mut rewritten: Vec<&str> = Vec::new();
            for opt in opts.split(',') {
                let opt = match opt {
                    "relatime" => atime,
                    opt => opt,
                };

                if !rewritten.contains(&opt) {
                    rewritten.push(opt);
                }
            }

            line.replacen(opts, &rewritten.join(","), 1)
        })
        .collect::<Vec<_>>()
        .join("\n");

    if fstab.ends_with('\n') {
        result.push('\n');
    }

    result
}

/// Returns the source of every entry not referenced by UUID
pub fn non_uuid_sources(fstab: &str) -> Vec<&str> {
    fstab
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .filter(|source| !source.starts_with("UUID="))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FSTAB: &str = "# /dev/sda3 LABEL=ROOT
UUID=aaaa\t/         \tbtrfs     \trw,relatime,compress=zstd:3,ssd,discard=async,space_cache=v2,subvolid=256,subvol=/@\t0 0

# /dev/sda1 LABEL=EFI
UUID=BBBB\t/boot     \tvfat      \trw,relatime,fmask=0022,dmask=0022\t0 2

UUID=cccc\tnone      \tswap      \tdefaults  \t0 0
";

    #[test]
    fn test_rewrite_atime() {
        let result = rewrite_atime(FSTAB, "noatime");

        assert!(!result.contains(",relatime,"));
        assert!(result.contains("rw,noatime,compress=zstd:3,"));
        assert!(result.contains("rw,noatime,fmask=0022"));
        assert!(result.contains("# /dev/sda3 LABEL=ROOT\n"));
        assert!(result.ends_with("0 0\n"));

        // Idempotent, and no duplicate noatime
        assert_eq!(result, rewrite_atime(&result, "noatime"));
        assert_eq!(
            "UUID=x / btrfs rw,noatime 0 0",
            rewrite_atime("UUID=x / btrfs rw,noatime,relatime 0 0", "noatime")
        );
    }

    #[test]
    fn test_non_uuid_sources() {
        assert!(non_uuid_sources(FSTAB).is_empty());
        assert_eq!(
            vec!["/dev/sda2"],
            non_uuid_sources("UUID=x / btrfs rw 0 0\n/dev/sda2 none swap defaults 0 0\n")
        );
    }
}
