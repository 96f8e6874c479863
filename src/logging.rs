use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::constants::ENV_PROVISION_LOG;

/// Installs the global subscriber: one timestamped, level-tagged line per
/// event appended to `log_file`. Falls back to stderr if the file cannot be
/// opened, so logging never stops a run.
pub fn init(log_file: &Path) {
    let env_filter =
        EnvFilter::try_from_env(ENV_PROVISION_LOG).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_ansi(false);

    match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => builder.with_writer(Mutex::new(file)).init(),
        Err(err) => {
            eprintln!(
                "{}",
                format!("cannot open log file {}: {err}, logging to stderr", log_file.display()).yellow()
            );
            builder.with_writer(std::io::stderr).init();
        }
    }
}

// Operator output: printed severity-coloured, and always logged as well

pub fn info(msg: &str) {
    println!("{msg}");
    tracing::info!("{msg}");
}

pub fn success(msg: &str) {
    println!("{}", msg.green());
    tracing::info!("{msg}");
}

pub fn warn(msg: &str) {
    eprintln!("{}", msg.yellow());
    tracing::warn!("{msg}");
}

pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
    tracing::error!("{msg}");
}
