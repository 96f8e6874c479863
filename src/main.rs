mod cli;
mod constants;
mod edit;
mod entity;
mod errors;
mod install;
mod linux;
mod logging;
mod prompt;
mod run;
mod utils;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use crate::constants::defaults;
use crate::errors::ProvisionError;
use crate::install::cleanup::{
    init_signal_handlers,
    Cleanup,
    CleanupGuard,
};
use crate::utils::shell::{
    Shell,
    System,
};

fn main() -> ExitCode {
    let _cli = cli::Cli::parse();
    logging::init(Path::new(defaults::LOG_FILE));

    let shell: Arc<dyn Shell> = Arc::new(System);
    let mount_root = run::install_location();

    // Dropped last, after the result has been reported
    let guard = CleanupGuard::new(Cleanup::new(shell.clone(), &mount_root));
    if let Err(err) = init_signal_handlers(guard.cleanup().clone()) {
        logging::error(&format!("cannot install signal handlers: {err}"));
        return ExitCode::FAILURE;
    }

    match run::run(shell, guard.cleanup()) {
        Ok(report) => {
            match report.summary.warnings().count() {
                0 => logging::success("Installation complete"),
                n => logging::warn(&format!("Installation complete, {n} hardening step(s) skipped")),
            }
            println!("{}", report.to_json_string());
            tracing::info!("report: {report}");

            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &ProvisionError) {
    logging::error(&format!("error: {}", err.root_cause()));

    if let ProvisionError::InstallError {
        error,
        stages_performed,
    } = err
    {
        logging::error(&format!("{error}"));
        match serde_json::to_string(stages_performed) {
            Ok(json) => logging::info(&format!("stages performed: {json}")),
            Err(err) => tracing::error!("cannot serialize stages performed: {err}"),
        }
    }
}
