//! Text transformations applied to configuration files of the target system.
//! Every function here is pure: it takes the original file content and
//! returns the new content, so callers decide where the bytes come from.

pub mod directive;
pub mod fstab;
pub mod mkinitcpio;
pub mod uncomment;
