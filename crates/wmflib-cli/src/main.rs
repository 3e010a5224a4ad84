use wmflib::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    // Initialize logging as early as possible.
    if let Err(err) = logging::init_logging(None) {
        logging::init_logging_stderr(None);
        tracing::warn!("file logging unavailable, using stderr: {:#}", anyhow::Error::new(err));
    }

    // Parse CLI and dispatch.
    if let Err(err) = CliCommand::run_from_args() {
        eprintln!("wmflib error: {:#}", err);
        std::process::exit(1);
    }
}
