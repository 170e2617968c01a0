//! Command-line arguments for the hull client.

use clap::Parser;
use hullhub_config::{SocketEndpoint, default_connect_endpoint};

/// Interactive client for the shared convex hull service.
#[derive(Parser, Debug)]
#[command(
    name = "hullhub",
    version,
    about = "Interactive client for the shared convex hull service"
)]
pub(crate) struct Cli {
    /// Service endpoint (`tcp://host:port` or `unix:///path`).
    #[arg(long, env = "HULLHUB_ENDPOINT", default_value_t = default_connect_endpoint())]
    pub(crate) endpoint: SocketEndpoint,
}
