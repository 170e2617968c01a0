//! Entry point for the `hullhub` client binary.

use std::io::{self, BufReader};
use std::process::ExitCode;

fn main() -> ExitCode {
    hullhub_cli::run(
        std::env::args_os(),
        BufReader::new(io::stdin()),
        &mut io::stdout(),
        &mut io::stderr(),
    )
}
