//! Structured health reporting for service lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use hullhub_config::{DispatchStrategy, SocketEndpoint};

use crate::service::ServiceError;
use crate::session::SessionId;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before the endpoint is bound.
    fn service_starting(&self, endpoint: &SocketEndpoint, strategy: DispatchStrategy);

    /// Invoked once the service accepts connections.
    fn service_ready(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>);

    /// Invoked when startup fails.
    fn service_failed(&self, error: &ServiceError);

    /// Invoked after a client has been greeted.
    fn session_opened(&self, session: SessionId, peer: &str);

    /// Invoked once a session has been detached.
    fn session_closed(&self, session: SessionId);

    /// Invoked after shutdown completes.
    fn service_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn service_starting(&self, endpoint: &SocketEndpoint, strategy: DispatchStrategy) {
        (**self).service_starting(endpoint, strategy);
    }

    fn service_ready(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>) {
        (**self).service_ready(endpoint, local_addr);
    }

    fn service_failed(&self, error: &ServiceError) {
        (**self).service_failed(error);
    }

    fn session_opened(&self, session: SessionId, peer: &str) {
        (**self).session_opened(session, peer);
    }

    fn session_closed(&self, session: SessionId) {
        (**self).session_closed(session);
    }

    fn service_stopped(&self) {
        (**self).service_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn service_starting(&self, endpoint: &SocketEndpoint, strategy: DispatchStrategy) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_starting",
            endpoint = %endpoint,
            strategy = %strategy,
            "starting hull service"
        );
    }

    fn service_ready(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_ready",
            endpoint = %endpoint,
            local_addr = ?local_addr,
            "hull service accepting connections"
        );
    }

    fn service_failed(&self, error: &ServiceError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "service_failed",
            error = %error,
            "hull service failed to start"
        );
    }

    fn session_opened(&self, session: SessionId, peer: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_opened",
            session = %session,
            peer,
            "client connected"
        );
    }

    fn session_closed(&self, session: SessionId) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_closed",
            session = %session,
            "client disconnected"
        );
    }

    fn service_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_stopped",
            "hull service stopped"
        );
    }
}
