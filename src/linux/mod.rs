pub mod blkid;
pub mod btrfs;
pub mod lsblk;
pub mod mkfs;
pub mod mount;
pub mod sgdisk;
pub mod user;
