//! Pumps stdin to the service and service replies to stdout.

use std::io::{self, BufRead, BufReader, Write};
use std::thread;

use super::AppError;
use super::transport::Connection;

/// Relays one interactive session until the service closes the connection.
///
/// Input lines are forwarded from a background thread. When input ends the
/// write half is shut down so the service sees end-of-stream and finishes
/// replying. A forwarder still blocked on input after the service has gone
/// is left behind; the process is about to exit.
pub(crate) fn relay<R, W>(connection: Connection, input: R, output: &mut W) -> Result<(), AppError>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let mut sender = connection.try_clone().map_err(AppError::Prepare)?;
    let forwarder = thread::Builder::new()
        .name("hullhub-input".to_owned())
        .spawn(move || forward_input(input, &mut sender))
        .map_err(AppError::Prepare)?;

    let printed = print_replies(connection, output);
    let forwarded = if forwarder.is_finished() {
        forwarder
            .join()
            .map_err(|_| AppError::ForwarderPanicked)?
    } else {
        Ok(())
    };
    printed.and(forwarded)
}

fn forward_input<R: BufRead>(input: R, connection: &mut Connection) -> Result<(), AppError> {
    let sent = send_lines(input, connection);
    let finished = connection.finish_writing().map_err(AppError::SendInput);
    match sent {
        Err(AppError::SendInput(error)) if is_hangup(&error) => Ok(()),
        other => other.and(finished),
    }
}

fn send_lines<R: BufRead>(input: R, connection: &mut Connection) -> Result<(), AppError> {
    for line in input.lines() {
        let line = line.map_err(AppError::ReadInput)?;
        connection
            .write_all(format!("{line}\n").as_bytes())
            .map_err(AppError::SendInput)?;
    }
    Ok(())
}

fn print_replies<W: Write>(connection: Connection, output: &mut W) -> Result<(), AppError> {
    for line in BufReader::new(connection).lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) if is_hangup(&error) => break,
            Err(error) => return Err(AppError::ReadReply(error)),
        };
        writeln!(output, "{line}").map_err(AppError::ForwardReply)?;
        output.flush().map_err(AppError::ForwardReply)?;
    }
    Ok(())
}

fn is_hangup(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
    )
}
