use depot_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    // File logging if the state dir is writable, stderr otherwise.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = CliCommand::run_from_args() {
        eprintln!("depot error: {:#}", err);
        std::process::exit(1);
    }
}
