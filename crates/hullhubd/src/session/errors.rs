use std::io;

use thiserror::Error;

use super::SessionId;

/// Failures that end a session.
///
/// Protocol mistakes are not errors at this level: they are answered with an
/// `Error: ...` reply and the session carries on.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading from or writing to the connection failed.
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The client sent a line longer than the framing limit.
    #[error("line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum accepted line length.
        limit: usize,
    },
    /// The session is no longer attached to the executor.
    #[error("{0} is not attached")]
    Detached(SessionId),
}
