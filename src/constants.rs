pub mod defaults {
    pub const MOUNT_ROOT: &str = "/mnt";
    pub const TIMEZONE: &str = "UTC";
    pub const LOCALE: &str = "en_US.UTF-8";
    pub const SWAP_SIZE_GB: u64 = 4;
    pub const LOG_FILE: &str = "/tmp/arch-provision.log";
    pub const BOOKKEEPING_FILE: &str = "/tmp/arch-provision-partitions.json";
    /// How long interrupted commands get to exit before SIGKILL
    pub const CHILD_GRACE: std::time::Duration = std::time::Duration::from_secs(3);
}

pub mod limits {
    pub const MIN_MEMORY_BYTES: u64 = 1024 * 1024 * 1024;
    pub const MIN_DISK_BYTES: u64 = 8 * 1024 * 1024 * 1024;
    pub const MIN_PASSWORD_LEN: usize = 6;
    pub const MAX_HOSTNAME_LEN: usize = 63;
    pub const MAX_USERNAME_LEN: usize = 32;
    pub const EFI_SIZE_BYTES: u64 = 1024 * 1024 * 1024;

    // Root must keep at least this much after EFI and swap are carved out
    pub const MIN_ROOT_BYTES: u64 = 4 * 1024 * 1024 * 1024;
}

pub mod net {
    use std::time::Duration;

    pub const CONNECTIVITY_URL: &str = "https://archlinux.org";
    pub const GEOLOCATION_URL: &str = "https://ipapi.co/timezone";
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
}

pub mod paths {
    pub const EFIVARS: &str = "/sys/firmware/efi/efivars";
    pub const MEMINFO: &str = "/proc/meminfo";
    pub const ZONEINFO: &str = "/usr/share/zoneinfo";
    pub const BOOT_DIR: &str = "boot";

    // Paths inside the target system
    pub const LOADER_CONF: &str = "/boot/loader/loader.conf";
    pub const LOADER_ENTRIES: &str = "/boot/loader/entries";
    pub const SUDOERS_DROPIN: &str = "/etc/sudoers.d/10-wheel";
    pub const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";
    pub const MKINITCPIO_CONF: &str = "/etc/mkinitcpio.conf";
    pub const LOCALE_GEN: &str = "/etc/locale.gen";
    pub const FAIL2BAN_JAIL: &str = "/etc/fail2ban/jail.local";
    pub const UFW_CONF: &str = "/etc/ufw/ufw.conf";
    pub const SECRETS_FILE: &str = "/root/.arch-provision-passwd";
}

pub mod partition {
    pub const SETTLE_DELAY: std::time::Duration = std::time::Duration::from_secs(2);

    pub const TYPE_CODE_EFI: &str = "ef00";
    pub const TYPE_CODE_SWAP: &str = "8200";
    pub const TYPE_CODE_ROOT: &str = "8300";

    pub const LABEL_EFI: &str = "EFI";
    pub const LABEL_SWAP: &str = "SWAP";
    pub const LABEL_ROOT: &str = "ROOT";
}

pub mod btrfs {
    /// Subvolume name and its mount point relative to the mount root.
    /// The root subvolume must stay first.
    pub const SUBVOLUMES: [(&str, &str); 6] = [
        ("@", ""),
        ("@home", "home"),
        ("@var", "var"),
        ("@log", "var/log"),
        ("@cache", "var/cache"),
        ("@snapshots", ".snapshots"),
    ];

    pub const ATIME: &str = "noatime";
    pub const COMPRESSION: &str = "zstd:3";
    pub const SPACE_CACHE: &str = "v2";
    pub const DISCARD: &str = "async";
}

pub mod boot {
    pub const KERNEL: &str = "/vmlinuz-linux";
    pub const INITRAMFS: &str = "/initramfs-linux.img";
    pub const INITRAMFS_FALLBACK: &str = "/initramfs-linux-fallback.img";
    pub const ENTRY_PRIMARY: &str = "arch.conf";
    pub const ENTRY_FALLBACK: &str = "arch-fallback.conf";
    pub const TITLE: &str = "Arch Linux";
    pub const LOADER_TIMEOUT: u32 = 3;

    pub const INITRAMFS_HOOKS: [&str; 11] = [
        "base",
        "udev",
        "autodetect",
        "microcode",
        "modconf",
        "kms",
        "keyboard",
        "keymap",
        "consolefont",
        "block",
        "filesystems",
    ];

    pub const INITRAMFS_BINARIES: [&str; 1] = ["btrfs"];
}

pub mod packages {
    pub const BASE: [&str; 12] = [
        "base",
        "base-devel",
        "linux",
        "linux-firmware",
        "btrfs-progs",
        "networkmanager",
        "sudo",
        "vim",
        "git",
        "man-db",
        "gcc",
        "make",
    ];

    pub const SSH: &str = "openssh";
    pub const FIREWALL: &str = "ufw";
    pub const BRUTEFORCE_GUARD: &str = "fail2ban";
}

pub mod services {
    pub const ALWAYS: [&str; 2] = ["NetworkManager.service", "systemd-timesyncd.service"];
    pub const SSH: &str = "sshd.service";
    pub const FIREWALL: &str = "ufw.service";
    pub const BRUTEFORCE_GUARD: &str = "fail2ban.service";
    pub const DISABLED: [&str; 3] = ["bluetooth.service", "cups.service", "avahi-daemon.service"];
}

pub const USER_GROUPS: [&str; 5] = ["wheel", "audio", "video", "storage", "input"];

pub const ENV_PROVISION_LOC: &str = "ARCH_PROVISION_LOC";
pub const ENV_PROVISION_LOG: &str = "ARCH_PROVISION_LOG";

// Use programs instead of bindings to avoid API dependencies
pub const REQUIRED_COMMANDS: [&str; 17] = [
    "sgdisk",
    "wipefs",
    "partprobe",
    "udevadm",
    "mkfs.fat",
    "mkswap",
    "mkfs.btrfs",
    "btrfs",
    "mount",
    "umount",
    "swapon",
    "swapoff",
    "lsblk",
    "blkid",
    "pacstrap",
    "genfstab",
    "arch-chroot",
];
