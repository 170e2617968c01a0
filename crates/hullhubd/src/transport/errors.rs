//! Failures while binding the service endpoint or running its accept thread.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Why the listener could not start, or did not stop cleanly.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host did not resolve, or resolved to no address at all.
    #[error("cannot resolve {host}:{port}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: Option<io::Error>,
    },
    #[error("cannot listen on {addr}: {source}")]
    BindTcp {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("cannot listen on {}: {source}", .path.display())]
    BindUnix {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Another process is accepting on the socket path.
    #[error("{} is served by another process", .path.display())]
    UnixInUse { path: PathBuf },
    /// The socket path is taken by something that is not a socket.
    #[error("{} exists and is not a socket", .path.display())]
    UnixNotSocket { path: PathBuf },
    /// A leftover socket file could not be checked or removed.
    #[error("cannot {step} leftover socket {}: {source}", .path.display())]
    StaleSocket {
        path: PathBuf,
        step: StaleSocketStep,
        #[source]
        source: io::Error,
    },
    #[error("cannot make the listener non-blocking: {0}")]
    NonBlocking(#[source] io::Error),
    #[error("cannot start the accept thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("accept thread panicked")]
    ThreadPanic,
}

/// Stage of leftover socket cleanup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleSocketStep {
    /// Reading the file type.
    Inspect,
    /// Connecting to see whether anyone still listens.
    Probe,
    /// Unlinking the dead socket.
    Remove,
}

impl fmt::Display for StaleSocketStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Inspect => "inspect",
            Self::Probe => "probe",
            Self::Remove => "remove",
        })
    }
}
