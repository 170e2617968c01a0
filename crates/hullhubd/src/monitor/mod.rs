//! Edge-triggered threshold tracking on the hull area.
//!
//! The executor feeds every computed area into a [`ThresholdMonitor`]. A
//! crossing is recorded only when the value moves from one side of the
//! threshold to the other, and each crossing is delivered exactly once to the
//! [`Watcher`] thread, even if several happen before it wakes.

mod watcher;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::lock_unpoisoned;

pub use self::watcher::{CrossingSink, TracingCrossingSink, Watcher, WatcherError, WatcherHandle};

const MONITOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::monitor");

/// Direction of a threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// The metric reached the threshold from below.
    Rose,
    /// The metric dropped below the threshold.
    Fell,
}

impl fmt::Display for Crossing {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Rose => "rose",
            Self::Fell => "fell",
        })
    }
}

/// One recorded crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEvent {
    /// Direction of travel.
    pub crossing: Crossing,
    /// Metric value that caused the crossing.
    pub metric: f64,
    /// Threshold in force.
    pub threshold: f64,
}

/// Latest observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdState {
    /// Most recent metric value.
    pub metric: f64,
    /// Whether that value is at or above the threshold.
    pub above: bool,
}

/// What [`ThresholdMonitor::wait`] woke up for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatchEvent {
    /// A crossing that has not been reported yet.
    Crossed(ThresholdEvent),
    /// The monitor was closed and every crossing has been handed out.
    Closed,
}

/// Shared threshold state plus the queue of unreported crossings.
pub struct ThresholdMonitor {
    threshold: f64,
    inner: Mutex<MonitorInner>,
    changed: Condvar,
}

struct MonitorInner {
    state: ThresholdState,
    pending: VecDeque<ThresholdEvent>,
    closed: bool,
}

impl ThresholdMonitor {
    /// Creates a monitor whose initial metric is zero.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            inner: Mutex::new(MonitorInner {
                state: ThresholdState {
                    metric: 0.0,
                    above: 0.0 >= threshold,
                },
                pending: VecDeque::new(),
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Threshold in force.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Records a new metric value.
    ///
    /// Returns the crossing when the value moved to the other side of the
    /// threshold. Updates after [`close`](Self::close) are ignored.
    pub fn update(&self, metric: f64) -> Option<ThresholdEvent> {
        let mut inner = lock_unpoisoned(&self.inner);
        if inner.closed {
            return None;
        }
        let above = metric >= self.threshold;
        let crossed = above != inner.state.above;
        inner.state = ThresholdState { metric, above };
        if !crossed {
            return None;
        }
        let event = ThresholdEvent {
            crossing: if above { Crossing::Rose } else { Crossing::Fell },
            metric,
            threshold: self.threshold,
        };
        inner.pending.push_back(event);
        drop(inner);
        self.changed.notify_all();
        Some(event)
    }

    /// Current observation.
    #[must_use]
    pub fn state(&self) -> ThresholdState {
        lock_unpoisoned(&self.inner).state
    }

    /// Blocks until an unreported crossing exists or the monitor closes.
    ///
    /// Crossings recorded before the close are still returned first.
    pub fn wait(&self) -> WatchEvent {
        let mut inner = lock_unpoisoned(&self.inner);
        loop {
            if let Some(event) = Self::take(&mut inner) {
                return event;
            }
            inner = self
                .changed
                .wait(inner)
                .unwrap_or_else(|poison| poison.into_inner());
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<WatchEvent> {
        let deadline = Instant::now() + timeout;
        let mut inner = lock_unpoisoned(&self.inner);
        loop {
            if let Some(event) = Self::take(&mut inner) {
                return Some(event);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            inner = self
                .changed
                .wait_timeout(inner, remaining)
                .unwrap_or_else(|poison| poison.into_inner())
                .0;
        }
    }

    /// Wakes every waiter and stops recording. Idempotent.
    pub fn close(&self) {
        lock_unpoisoned(&self.inner).closed = true;
        self.changed.notify_all();
    }

    fn take(inner: &mut MutexGuard<'_, MonitorInner>) -> Option<WatchEvent> {
        if let Some(event) = inner.pending.pop_front() {
            return Some(WatchEvent::Crossed(event));
        }
        inner.closed.then_some(WatchEvent::Closed)
    }
}
