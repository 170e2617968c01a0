//! Interchangeable strategies for driving connected sessions.
//!
//! A [`DispatchCore`] owns registered connections and calls their
//! [`OnReadable`] handler whenever input may be available. Two cores exist:
//!
//! - [`ReadinessLoop`]: one control thread polls every registered socket and
//!   runs the handlers of the ready ones in turn.
//! - [`WorkerPerConnection`]: one thread per connection runs its handler until
//!   the session ends or the core cancels it.
//!
//! Both give the same protocol behaviour; the choice is a deployment knob.

mod cancel;
#[cfg(test)]
mod contract_tests;
mod errors;
mod reactor;
#[cfg(test)]
mod test_support;
mod workers;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::session::SessionError;
use crate::transport::ConnectionStream;

pub use self::cancel::CancelToken;
pub use self::errors::DispatchError;
pub use self::reactor::ReadinessLoop;
pub use self::workers::WorkerPerConnection;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Identifies one registration within a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl Token {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "conn-{}", self.0)
    }
}

/// What a handler wants after processing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep the connection registered.
    Continue,
    /// Deregister and close the connection.
    Close,
}

/// Per-connection callback run by a dispatch core.
pub trait OnReadable: Send + Sync {
    /// Handles input that may be waiting on `stream`.
    ///
    /// Called from the reactor thread or from the connection's worker. A
    /// handler must treat `WouldBlock` and `TimedOut` reads as "nothing yet".
    ///
    /// # Errors
    ///
    /// An error ends the connection exactly like [`Flow::Close`].
    fn on_readable(&self, stream: &ConnectionStream) -> Result<Flow, SessionError>;

    /// Runs once after the connection leaves the core, for any reason.
    fn on_close(&self);
}

/// Builds the handler for a freshly accepted connection.
pub trait OnAccept: Send + Sync {
    /// Prepares session state for `stream` and returns its handler.
    ///
    /// # Errors
    ///
    /// A failure drops the connection before it is registered.
    fn on_accept(&self, stream: &ConnectionStream) -> Result<Arc<dyn OnReadable>, SessionError>;
}

/// Common contract of the dispatch strategies.
///
/// Handlers may call [`register`](Self::register) and
/// [`deregister`](Self::deregister) from inside a callback, including on
/// their own token.
pub trait DispatchCore: Send + Sync {
    /// Takes ownership of `stream` and starts calling `handler` for it.
    ///
    /// # Errors
    ///
    /// Fails when the core is not running, when the socket cannot be
    /// configured, or when a worker thread cannot be spawned.
    fn register(
        &self,
        stream: ConnectionStream,
        handler: Arc<dyn OnReadable>,
    ) -> Result<Token, DispatchError>;

    /// Stops servicing `token`, closes its socket and runs `on_close`.
    /// Returns `false` when the token is unknown.
    fn deregister(&self, token: Token) -> bool;

    /// Starts the core. Registrations are refused until this is called.
    ///
    /// # Errors
    ///
    /// Fails when a control thread cannot be spawned.
    fn start_all(&self) -> Result<(), DispatchError>;

    /// Stops every connection and joins every thread the core started.
    /// Every remaining handler sees `on_close` before this returns.
    ///
    /// # Errors
    ///
    /// Reports threads that panicked; cleanup still completes.
    fn stop_all(&self) -> Result<(), DispatchError>;

    /// Number of live registrations.
    fn active(&self) -> usize;
}

/// Runs `on_readable` with panics converted into a closing outcome.
fn guarded_readable(
    token: Token,
    handler: &dyn OnReadable,
    stream: &ConnectionStream,
) -> Result<Flow, SessionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.on_readable(stream))) {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(target: DISPATCH_TARGET, token = %token, "handler panicked");
            Ok(Flow::Close)
        }
    }
}

/// Runs `on_close`, containing any panic to the one connection.
fn guarded_close(token: Token, handler: &dyn OnReadable) {
    if panic::catch_unwind(AssertUnwindSafe(|| handler.on_close())).is_err() {
        error!(target: DISPATCH_TARGET, token = %token, "close handler panicked");
    }
}
