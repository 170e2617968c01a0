//! Interactive client for the shared convex hull service.
//!
//! The client connects to a running `hullhubd`, prints every line the
//! service sends and forwards standard input line by line. Input and output
//! streams are injected so tests can drive a session without a terminal.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod errors;
mod relay;
mod transport;


use cli::Cli;
use errors::{AppError, is_service_not_running};
use relay::relay;
use transport::connect;

/// Runs the client with the given arguments and streams.
///
/// Returns success once the service closes the session. Usage errors,
/// connection failures and IO errors are written to `stderr`.
#[must_use]
pub fn run<I, R, W, E>(args: I, input: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead + Send + 'static,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };

    match connect(&cli.endpoint).and_then(|connection| relay(connection, input, stdout)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_failure(&error, &cli, stderr);
            ExitCode::FAILURE
        }
    }
}

fn report_usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    let rendered = error.render();
    if error.use_stderr() {
        let _ = write!(stderr, "{rendered}");
        ExitCode::FAILURE
    } else {
        let _ = write!(stdout, "{rendered}");
        ExitCode::SUCCESS
    }
}

fn report_failure<E: Write>(error: &AppError, cli: &Cli, stderr: &mut E) {
    let _ = writeln!(stderr, "{error}");
    if is_service_not_running(error) {
        let _ = writeln!(stderr, "is hullhubd listening on {}?", cli.endpoint);
    }
}
