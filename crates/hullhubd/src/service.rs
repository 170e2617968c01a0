//! Wiring of listener, dispatch core, executor and watcher into one service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use hullhub_config::{
    Config, DEFAULT_AREA_THRESHOLD, DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_WRITE_TIMEOUT_MS, DispatchStrategy, SocketDirError, SocketEndpoint,
};

use crate::dispatch::{DispatchCore, DispatchError, ReadinessLoop, WorkerPerConnection};
use crate::executor::CommandExecutor;
use crate::health::HealthReporter;
use crate::monitor::{CrossingSink, ThresholdMonitor, Watcher, WatcherError, WatcherHandle};
use crate::session::SessionFactory;
use crate::transport::{Acceptor, AcceptorHandle, ListenerError, SocketListener};

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Runtime knobs for one service instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// Endpoint to bind.
    pub endpoint: SocketEndpoint,
    /// Dispatch strategy for accepted connections.
    pub strategy: DispatchStrategy,
    /// Hull area watched for crossings.
    pub area_threshold: f64,
    /// Readiness loop wait per pass.
    pub poll_interval: Duration,
    /// Worker read timeout, bounding how long a stop can take.
    pub read_timeout: Duration,
    /// Upper bound on delivering one reply line.
    pub write_timeout: Duration,
}

impl ServiceSettings {
    /// Default settings for `endpoint`.
    #[must_use]
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            strategy: DispatchStrategy::default(),
            area_threshold: DEFAULT_AREA_THRESHOLD,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }

    /// Replaces the dispatch strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: DispatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replaces the area threshold.
    #[must_use]
    pub fn with_area_threshold(mut self, threshold: f64) -> Self {
        self.area_threshold = threshold;
        self
    }

    /// Replaces both the poll interval and the worker read timeout.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.poll_interval = tick;
        self.read_timeout = tick;
        self
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            endpoint: config.listen().clone(),
            strategy: config.strategy(),
            area_threshold: config.area_threshold(),
            poll_interval: config.poll_interval(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// Errors raised while starting or stopping the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    SocketDir(#[from] SocketDirError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// A running hull service.
///
/// Dropping a service without calling [`shutdown`](Self::shutdown) performs
/// the same shutdown and logs any failure.
pub struct Service {
    endpoint: SocketEndpoint,
    local_addr: Option<SocketAddr>,
    executor: Arc<CommandExecutor>,
    monitor: Arc<ThresholdMonitor>,
    core: Arc<dyn DispatchCore>,
    acceptor: Option<AcceptorHandle>,
    watcher: Option<WatcherHandle>,
    reporter: Arc<dyn HealthReporter>,
    stopped: bool,
}

impl Service {
    /// Binds the endpoint and starts accepting clients.
    ///
    /// Crossings of the area threshold are delivered to `sink` from a
    /// dedicated watcher thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when any part fails to start; parts already
    /// started are stopped again first.
    pub fn start(
        settings: &ServiceSettings,
        sink: Arc<dyn CrossingSink>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, ServiceError> {
        reporter.service_starting(&settings.endpoint, settings.strategy);
        match Self::launch(settings, sink, Arc::clone(&reporter)) {
            Ok(service) => {
                reporter.service_ready(&service.endpoint, service.local_addr);
                Ok(service)
            }
            Err(error) => {
                reporter.service_failed(&error);
                Err(error)
            }
        }
    }

    fn launch(
        settings: &ServiceSettings,
        sink: Arc<dyn CrossingSink>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, ServiceError> {
        settings.endpoint.ensure_socket_dir()?;
        let listener = SocketListener::bind(&settings.endpoint)?;
        let local_addr = listener.local_addr();

        let monitor = Arc::new(ThresholdMonitor::new(settings.area_threshold));
        let watcher = Watcher::spawn(Arc::clone(&monitor), sink)?;
        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(&monitor),
            settings.write_timeout,
        ));
        let core: Arc<dyn DispatchCore> = match settings.strategy {
            DispatchStrategy::Reactor => Arc::new(ReadinessLoop::new(settings.poll_interval)),
            DispatchStrategy::Proactor => Arc::new(WorkerPerConnection::new(
                settings.read_timeout,
                settings.write_timeout,
            )),
        };

        let mut service = Self {
            endpoint: settings.endpoint.clone(),
            local_addr,
            executor: Arc::clone(&executor),
            monitor,
            core: Arc::clone(&core),
            acceptor: None,
            watcher: Some(watcher),
            reporter: Arc::clone(&reporter),
            stopped: false,
        };
        let started = match core.start_all() {
            Ok(()) => {
                let factory = Arc::new(SessionFactory::new(executor, reporter));
                Acceptor::new(listener, factory, core)
                    .start()
                    .map_err(ServiceError::from)
            }
            Err(error) => {
                listener.cleanup();
                Err(error.into())
            }
        };
        match started {
            Ok(acceptor) => {
                service.acceptor = Some(acceptor);
                info!(
                    target: SERVICE_TARGET,
                    endpoint = %service.endpoint,
                    strategy = %settings.strategy,
                    threshold = settings.area_threshold,
                    "hull service started"
                );
                Ok(service)
            }
            Err(error) => {
                if let Err(cleanup) = service.stop() {
                    warn!(
                        target: SERVICE_TARGET,
                        error = %cleanup,
                        "cleanup after failed start also failed"
                    );
                }
                service.stopped = true;
                Err(error)
            }
        }
    }

    /// Endpoint the service was started on.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Bound TCP address, if the endpoint is TCP.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Shared executor, for inspection.
    #[must_use]
    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    /// Threshold monitor fed by hull computations.
    #[must_use]
    pub fn monitor(&self) -> &Arc<ThresholdMonitor> {
        &self.monitor
    }

    /// Connections currently registered with the dispatch core.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.core.active()
    }

    /// Stops the service.
    ///
    /// The steps run in order: stop accepting, stop every connection and
    /// detach its session, close the monitor, join the watcher, release any
    /// graph lock still held and drain the queue one last time.
    ///
    /// # Errors
    ///
    /// Returns the first failure; later steps still run.
    pub fn shutdown(mut self) -> Result<(), ServiceError> {
        let result = self.stop();
        self.reporter.service_stopped();
        self.stopped = true;
        result
    }

    fn stop(&mut self) -> Result<(), ServiceError> {
        info!(target: SERVICE_TARGET, endpoint = %self.endpoint, "stopping hull service");
        let mut first_error: Option<ServiceError> = None;
        let mut note = |result: Result<(), ServiceError>| {
            if let Err(error) = result {
                warn!(target: SERVICE_TARGET, error = %error, "shutdown step failed");
                first_error.get_or_insert(error);
            }
        };

        if let Some(acceptor) = self.acceptor.take() {
            acceptor.shutdown();
            note(acceptor.join().map_err(ServiceError::from));
        }
        note(self.core.stop_all().map_err(ServiceError::from));
        self.monitor.close();
        if let Some(watcher) = self.watcher.take() {
            note(watcher.join().map_err(ServiceError::from));
        }
        if let Some(session) = self.executor.recover() {
            warn!(
                target: SERVICE_TARGET,
                session = %session,
                "graph lock recovered during shutdown"
            );
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(error) = self.stop() {
            warn!(target: SERVICE_TARGET, error = %error, "shutdown on drop failed");
        }
    }
}
