use take2_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {err:#}");
    }

    match CliCommand::run_from_args() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("take2 error: {:#}", err);
            std::process::exit(1);
        }
    }
}
