use std::io;

use thiserror::Error;

/// Errors raised by dispatch cores.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A control or worker thread could not be spawned.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: io::Error,
    },
    /// The socket could not be switched to the mode the core needs.
    #[error("failed to configure connection socket: {source}")]
    Configure {
        #[source]
        source: io::Error,
    },
    /// The core is not accepting registrations.
    #[error("dispatch core is not running")]
    NotRunning,
    /// A thread panicked before it could be joined.
    #[error("{role} thread panicked")]
    ThreadPanic { role: &'static str },
}
