use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// TCP port the service listens on unless told otherwise.
pub const DEFAULT_TCP_PORT: u16 = 9034;

/// Host the default TCP endpoint binds to.
pub const DEFAULT_TCP_HOST: &str = "0.0.0.0";

/// Host the client connects to by default.
pub const DEFAULT_CONNECT_HOST: &str = "127.0.0.1";

/// Hull area at or above which the threshold watcher reports a crossing.
pub const DEFAULT_AREA_THRESHOLD: f64 = 100.0;

/// Upper bound on a single readiness poll, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Read timeout applied to worker connections, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Budget for writing one batch of replies, in milliseconds.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint the service listens on by default.
#[must_use]
pub fn default_listen_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT)
}

/// Endpoint the client connects to by default.
#[must_use]
pub fn default_connect_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_CONNECT_HOST, DEFAULT_TCP_PORT)
}
