//! Defines the unified error surface for running the service process.

use thiserror::Error;

use crate::service::ServiceError;
use crate::telemetry::TelemetryError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the service.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The service failed to start.
    #[error("service failed to start: {source}")]
    Start {
        /// Underlying service error.
        #[source]
        source: ServiceError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// Part of the shutdown sequence failed.
    #[error("service did not stop cleanly: {source}")]
    Stop {
        /// Underlying service error.
        #[source]
        source: ServiceError,
    },
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
