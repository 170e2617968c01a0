//! Error types for the client runtime.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve service address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to service at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    #[error("failed to prepare the connection: {0}")]
    Prepare(io::Error),
    #[error("failed to send input to the service: {0}")]
    SendInput(io::Error),
    #[error("failed to read input: {0}")]
    ReadInput(io::Error),
    #[error("failed to read from the service: {0}")]
    ReadReply(io::Error),
    #[error("failed to print service output: {0}")]
    ForwardReply(io::Error),
    #[error("input forwarding thread panicked")]
    ForwarderPanicked,
}

/// Returns `true` when the error means nothing is listening at the endpoint.
pub(crate) fn is_service_not_running(error: &AppError) -> bool {
    match error {
        AppError::Connect { source, .. } => matches!(
            source.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::NotFound
                | io::ErrorKind::AddrNotAvailable
        ),
        _ => false,
    }
}
