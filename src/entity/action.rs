use std::collections::BTreeSet;

use serde::{
    Deserialize,
    Serialize,
};

use super::plan::{
    FsType,
    PartitionRole,
    PartitionSize,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Partition(ActionPartition),
    Provision(ActionProvision),
    Bootstrap(ActionBootstrap),
    Configure(ActionConfigure),
    Boot(ActionBoot),
    Harden(ActionHarden),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionPartition {
    #[serde(rename = "reprobeDisk")]
    ReprobeDisk { device: String },

    #[serde(rename = "preClean")]
    PreClean { mount_root: String },

    #[serde(rename = "wipeSignatures")]
    WipeSignatures { device: String },

    #[serde(rename = "zapPartitionTable")]
    ZapPartitionTable { device: String },

    #[serde(rename = "createPartition")]
    CreatePartition {
        device: String,
        number: usize,
        role: PartitionRole,
        size: PartitionSize,
        type_code: String,
    },

    #[serde(rename = "rescanPartitions")]
    RescanPartitions { device: String },

    #[serde(rename = "createFilesystem")]
    CreateFs { device: String, fs_type: FsType },

    #[serde(rename = "writeBookkeeping")]
    WriteBookkeeping { path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionProvision {
    #[serde(rename = "mountTopLevel")]
    MountTopLevel { src: String, dst: String },

    #[serde(rename = "createSubvolume")]
    CreateSubvolume(String),

    #[serde(rename = "unmountTopLevel")]
    UnmountTopLevel(String),

    #[serde(rename = "mkdirMountpoint")]
    MkdirMountpoint(String),

    #[serde(rename = "mountSubvolume")]
    MountSubvolume {
        src: String,
        subvolume: String,
        dst: String,
        opts: String,
    },

    #[serde(rename = "mountEfi")]
    MountEfi { src: String, dst: String },

    #[serde(rename = "swapOn")]
    SwapOn(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionBootstrap {
    #[serde(rename = "installPackages")]
    InstallPackages { packages: BTreeSet<String> },

    #[serde(rename = "genfstab")]
    GenFstab,

    #[serde(rename = "rewriteFstabAtime")]
    RewriteFstabAtime(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionConfigure {
    #[serde(rename = "linkTimezone")]
    LinkTimezone(String),

    #[serde(rename = "hwclock")]
    HwClock,

    #[serde(rename = "localeGen")]
    LocaleGen(String),

    #[serde(rename = "localeConf")]
    LocaleConf,

    #[serde(rename = "setHostname")]
    SetHostname(String),

    #[serde(rename = "writeHosts")]
    WriteHosts,

    #[serde(rename = "setPasswords")]
    SetPasswords { users: Vec<String> },

    #[serde(rename = "createUser")]
    CreateUser { name: String, groups: Vec<String> },

    #[serde(rename = "sudoers")]
    Sudoers,

    #[serde(rename = "enableService")]
    EnableService(String),

    #[serde(rename = "sshdConfig")]
    SshdConfig { password_auth: bool },

    #[serde(rename = "mkinitcpio")]
    Mkinitcpio { hooks: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionBoot {
    #[serde(rename = "bootctlInstall")]
    BootctlInstall,

    #[serde(rename = "loaderConf")]
    LoaderConf,

    #[serde(rename = "bootEntry")]
    BootEntry { file_name: String, root_uuid: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionHarden {
    #[serde(rename = "firewall")]
    Firewall { allow_ssh: bool },

    #[serde(rename = "disableService")]
    DisableService(String),

    #[serde(rename = "bruteforceGuard")]
    BruteforceGuard,

    #[serde(rename = "restrictHome")]
    RestrictHome(String),

    #[serde(rename = "warning")]
    Warning { step: String, error: String },
}
