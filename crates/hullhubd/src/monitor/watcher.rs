//! Background consumer that reports threshold crossings.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, info};

use super::{Crossing, MONITOR_TARGET, ThresholdEvent, ThresholdMonitor, WatchEvent};

/// Receives each crossing exactly once, in order.
pub trait CrossingSink: Send + Sync {
    /// Handles one crossing.
    fn crossed(&self, event: &ThresholdEvent);
}

/// Sink that logs crossings through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrossingSink;

impl CrossingSink for TracingCrossingSink {
    fn crossed(&self, event: &ThresholdEvent) {
        let verb = match event.crossing {
            Crossing::Rose => "belongs",
            Crossing::Fell => "no longer belongs",
        };
        info!(
            target: MONITOR_TARGET,
            crossing = %event.crossing,
            metric = event.metric,
            threshold = event.threshold,
            "At Least {} units {verb} to CH",
            event.threshold
        );
    }
}

/// Errors raised while running the watcher thread.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to spawn watcher thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    #[error("watcher thread panicked")]
    ThreadPanic,
}

/// Starts the thread that drains a monitor into a sink.
pub struct Watcher;

impl Watcher {
    /// Spawns the watcher. It exits once the monitor is closed and every
    /// recorded crossing has been delivered.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Spawn`] when the thread cannot be created.
    pub fn spawn(
        monitor: Arc<ThresholdMonitor>,
        sink: Arc<dyn CrossingSink>,
    ) -> Result<WatcherHandle, WatcherError> {
        let thread = thread::Builder::new()
            .name("hullhub-watcher".to_owned())
            .spawn(move || watch(&monitor, sink.as_ref()))
            .map_err(|source| WatcherError::Spawn { source })?;
        Ok(WatcherHandle {
            thread: Some(thread),
        })
    }
}

fn watch(monitor: &ThresholdMonitor, sink: &dyn CrossingSink) {
    debug!(target: MONITOR_TARGET, threshold = monitor.threshold(), "watcher started");
    while let WatchEvent::Crossed(event) = monitor.wait() {
        if panic::catch_unwind(AssertUnwindSafe(|| sink.crossed(&event))).is_err() {
            error!(target: MONITOR_TARGET, "crossing sink panicked");
        }
    }
    debug!(target: MONITOR_TARGET, "watcher stopped");
}

/// Handle to the watcher thread.
pub struct WatcherHandle {
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Waits for the watcher to exit. Close the monitor first.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::ThreadPanic`] if the thread panicked.
    pub fn join(mut self) -> Result<(), WatcherError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| WatcherError::ThreadPanic),
            None => Ok(()),
        }
    }
}
