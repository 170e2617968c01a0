//! Shared convex hull graph service.
//!
//! Clients connect over TCP or a Unix socket and edit one process-wide point
//! set with a line protocol (`Newgraph n`, `CH`, `Newpoint x,y`,
//! `Removepoint x,y`, `exit`). Edits are serialised through an exclusive
//! document lock; commands that arrive while another session holds it wait
//! in a FIFO queue.
//!
//! Connections are driven by one of two interchangeable dispatch cores: a
//! single-threaded readiness loop or a worker thread per connection. A
//! watcher thread reports whenever the hull area crosses a configured
//! threshold.

pub mod dispatch;
pub mod executor;
pub mod geometry;
pub mod graph;
mod health;
pub mod monitor;
mod process;
pub mod service;
pub mod session;
pub mod telemetry;
pub mod transport;

use std::sync::{Mutex, MutexGuard};

pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use service::{Service, ServiceError, ServiceSettings};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests;
