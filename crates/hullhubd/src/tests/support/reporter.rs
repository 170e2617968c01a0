//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use hullhub_config::{DispatchStrategy, SocketEndpoint};

use crate::health::HealthReporter;
use crate::lock_unpoisoned;
use crate::service::ServiceError;
use crate::session::SessionId;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    Starting(DispatchStrategy),
    Ready,
    Failed(String),
    SessionOpened(SessionId),
    SessionClosed(SessionId),
    Stopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        lock_unpoisoned(&self.events).clone()
    }

    /// Lifecycle events only, without per-session noise.
    pub(crate) fn lifecycle(&self) -> Vec<HealthEvent> {
        self.events()
            .into_iter()
            .filter(|event| {
                !matches!(
                    event,
                    HealthEvent::SessionOpened(_) | HealthEvent::SessionClosed(_)
                )
            })
            .collect()
    }

    fn record(&self, event: HealthEvent) {
        lock_unpoisoned(&self.events).push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn service_starting(&self, _endpoint: &SocketEndpoint, strategy: DispatchStrategy) {
        self.record(HealthEvent::Starting(strategy));
    }

    fn service_ready(&self, _endpoint: &SocketEndpoint, _local_addr: Option<SocketAddr>) {
        self.record(HealthEvent::Ready);
    }

    fn service_failed(&self, error: &ServiceError) {
        self.record(HealthEvent::Failed(error.to_string()));
    }

    fn session_opened(&self, session: SessionId, _peer: &str) {
        self.record(HealthEvent::SessionOpened(session));
    }

    fn session_closed(&self, session: SessionId) {
        self.record(HealthEvent::SessionClosed(session));
    }

    fn service_stopped(&self) {
        self.record(HealthEvent::Stopped);
    }
}
