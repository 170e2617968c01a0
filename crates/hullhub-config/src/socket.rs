//! Where the daemon listens and where the client dials.
//!
//! Endpoints travel as URLs through flags and the environment:
//! `tcp://host:port` or `unix:///path/to/socket`. The same text form is used
//! when a [`Config`](crate::Config) is serialised.

use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A TCP address or a Unix socket path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SocketEndpoint {
    /// Host and port. Port 0 lets the OS pick when listening.
    Tcp { host: String, port: u16 },
    /// Filesystem path of a Unix domain socket.
    Unix { path: Utf8PathBuf },
}

impl SocketEndpoint {
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Socket file path, for Unix endpoints only.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_path()),
            Self::Tcp { .. } => None,
        }
    }

    /// Makes sure the directory a Unix socket is bound in exists. Missing
    /// directories are created readable by the owner only; TCP endpoints and
    /// bare file names need nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SocketDirError`] when the directory cannot be created.
    pub fn ensure_socket_dir(&self) -> Result<(), SocketDirError> {
        let Some(dir) = self
            .unix_path()
            .and_then(Utf8Path::parent)
            .filter(|dir| !dir.as_str().is_empty())
        else {
            return Ok(());
        };
        owner_only_dirs()
            .create(dir)
            .map_err(|source| SocketDirError {
                dir: dir.to_path_buf(),
                source,
            })
    }
}

fn owner_only_dirs() -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);
    builder
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
            Self::Unix { path } => write!(formatter, "unix://{path}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url =
            Url::parse(input).map_err(|error| SocketParseError::NotAUrl(input.to_owned(), error))?;
        match url.scheme() {
            "tcp" => match (url.host_str(), url.port()) {
                (Some(host), Some(port)) if !host.is_empty() => Ok(Self::tcp(host, port)),
                _ => Err(SocketParseError::TcpAddress(input.to_owned())),
            },
            "unix" => match url.path() {
                "" | "/" => Err(SocketParseError::UnixPath(input.to_owned())),
                path => Ok(Self::unix(path)),
            },
            _ => Err(SocketParseError::Scheme(input.to_owned())),
        }
    }
}

impl TryFrom<String> for SocketEndpoint {
    type Error = SocketParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SocketEndpoint> for String {
    fn from(endpoint: SocketEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Why an endpoint string was rejected. Each variant carries the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketParseError {
    #[error("'{0}' is not an endpoint URL: {1}")]
    NotAUrl(String, url::ParseError),
    #[error("'{0}' must use the tcp:// or unix:// scheme")]
    Scheme(String),
    #[error("'{0}' must name both a host and a port")]
    TcpAddress(String),
    #[error("'{0}' must name a socket path")]
    UnixPath(String),
}

/// The directory for a Unix socket could not be created.
#[derive(Debug, Error)]
#[error("cannot create socket directory {dir}: {source}")]
pub struct SocketDirError {
    pub dir: Utf8PathBuf,
    #[source]
    pub source: std::io::Error,
}
