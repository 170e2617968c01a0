//! Runs the service until a shutdown signal arrives.

use std::sync::Arc;

use tracing::info;

use hullhub_config::Config;

use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::monitor::{CrossingSink, TracingCrossingSink};
use crate::service::{Service, ServiceSettings};
use crate::telemetry;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the service with the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when telemetry or the service cannot start, when
/// signal handlers cannot be installed, or when shutdown fails.
pub fn run_daemon(config: &Config) -> Result<(), LaunchError> {
    let _telemetry = telemetry::initialise(config)?;
    run_daemon_with(
        config,
        &SystemShutdownSignal::new(),
        Arc::new(StructuredHealthReporter::new()),
        Arc::new(TracingCrossingSink),
    )
}

/// Runs the service with injected collaborators.
pub(crate) fn run_daemon_with<S>(
    config: &Config,
    shutdown: &S,
    reporter: Arc<dyn HealthReporter>,
    sink: Arc<dyn CrossingSink>,
) -> Result<(), LaunchError>
where
    S: ShutdownSignal,
{
    info!(
        target: PROCESS_TARGET,
        endpoint = %config.listen(),
        strategy = %config.strategy(),
        "starting service runtime"
    );
    let service = Service::start(&ServiceSettings::from(config), sink, reporter)
        .map_err(|source| LaunchError::Start { source })?;
    let waited = shutdown.wait();
    let stopped = service
        .shutdown()
        .map_err(|source| LaunchError::Stop { source });
    waited?;
    stopped?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
