use clap::Parser;
use httpmount_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Fall back to stderr when the state dir is unwritable; logging must not stop the mount.
    if let Err(err) = logging::init_logging(cli.debug) {
        logging::init_logging_stderr(cli.debug);
        tracing::warn!("log file unavailable, logging to stderr: {:#}", err);
    }

    if let Err(err) = cli.run() {
        eprintln!("httpmount error: {:#}", err);
        std::process::exit(1);
    }
}
