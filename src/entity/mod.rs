pub mod action;
pub mod boot;
pub mod config;
pub mod disk;
pub mod layout;
pub mod plan;
pub mod report;
pub mod stage;
pub mod table;

use humanize_rs::bytes;

use crate::errors::ProvisionError;

pub fn parse_human_bytes(s: &str) -> std::result::Result<bytes::Bytes, ProvisionError> {
    (s.to_lowercase())
        .parse::<bytes::Bytes>()
        .map_err(|err| ProvisionError::BadInput(format!("bad byte unit string {s}: {err}")))
}

/// Normalizes a capacity as printed by lsblk (e.g. `931.5G`, `500M`, `1,8T`)
/// to bytes. lsblk suffixes are binary multiples, so `G` means GiB.
pub fn parse_capacity(s: &str) -> Result<u64, ProvisionError> {
    let s = s.trim().replace(',', ".");
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());

    let (number, unit) = s.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|err| ProvisionError::BadInput(format!("bad capacity {s}: {err}")))?;

    let factor = match unit.trim().chars().next() {
        None | Some('B') | Some('b') => 1,
        Some(prefix) => parse_human_bytes(&format!("1{prefix}i"))?.size() as u64,
    };

    Ok((number * factor as f64).round() as u64)
}

/// Formats bytes with the largest binary unit that keeps the value >= 1
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{value:.1} {}", UNITS[unit]),
    }
}
