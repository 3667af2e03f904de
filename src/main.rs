// Entrypoint for the CLI application.
// - Flags are parsed first; a bad flag exits with a usage error before any
//   file or network access.
// - Everything else lives in `app::run`.
// - A fatal error is printed once, in red when stderr is a terminal.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Stylize;
use gcs_demo::{app, cli::Args, logging::init_logging};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.logging_level);

    match app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let label = if io::stderr().is_terminal() {
                "Error:".red().bold().to_string()
            } else {
                "Error:".to_string()
            };
            eprintln!("{label} {e:#}");
            ExitCode::FAILURE
        }
    }
}
