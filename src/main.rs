//! Application entry point.
//!
//! Parses command-line arguments and delegates execution to [`cli::execute`].

use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;
use tsukemono::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt().with_max_level(max_level).with_writer(io::stderr).init();
    let mut stdout = io::stdout().lock();
    match cli::execute(&cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            ExitCode::FAILURE
        }
    }
}
