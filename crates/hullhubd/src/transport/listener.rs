//! Bound listening sockets.

use std::fs;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use tracing::warn;

use hullhub_config::SocketEndpoint;

use super::{ConnectionStream, ListenerError, StaleSocketStep, TRANSPORT_TARGET};

/// Listener bound to a configured endpoint.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl SocketListener {
    /// Binds `endpoint`, replacing a stale Unix socket file when nothing is
    /// listening on it.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when resolution or binding fails, or when a
    /// live process already owns the Unix socket.
    pub fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let listener = match endpoint {
            SocketEndpoint::Tcp { host, port } => ListenerKind::Tcp(bind_tcp(host, *port)?),
            SocketEndpoint::Unix { path } => ListenerKind::Unix(bind_unix(path.as_std_path())?),
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Endpoint this listener was bound from.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Actual TCP address, useful after binding port 0. `None` for Unix sockets.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            ListenerKind::Unix(_) => None,
        }
    }

    pub(crate) fn set_nonblocking(&self) -> Result<(), ListenerError> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        }
        .map_err(ListenerError::NonBlocking)
    }

    /// Accepts one pending client, if any. Accepted streams are blocking.
    pub(crate) fn accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match &self.listener {
            ListenerKind::Tcp(tcp) => tcp.accept().map(|(stream, _)| ConnectionStream::Tcp(stream)),
            ListenerKind::Unix(unix) => unix
                .accept()
                .map(|(stream, _)| ConnectionStream::Unix(stream)),
        };
        match accepted {
            Ok(stream) => {
                stream.set_nonblocking(false)?;
                Ok(Some(stream))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Removes the Unix socket file, if this listener created one.
    pub(crate) fn cleanup(&self) {
        let SocketEndpoint::Unix { path } = &self.endpoint else {
            return;
        };
        if let Err(error) = fs::remove_file(path.as_std_path())
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: TRANSPORT_TARGET,
                error = %error,
                path = %path,
                "failed to remove unix socket file"
            );
        }
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let unresolved = |source| ListenerError::Resolve {
        host: host.to_owned(),
        port,
        source,
    };
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|error| unresolved(Some(error)))?
        .next()
        .ok_or_else(|| unresolved(None))?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        clear_stale_socket(path)?;
    }
    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.to_owned(),
        source,
    })
}

/// Unlinks a socket file nobody accepts on any more. Live sockets and
/// non-socket files are left in place.
fn clear_stale_socket(path: &Path) -> Result<(), ListenerError> {
    let failed = |step, source| ListenerError::StaleSocket {
        path: path.to_owned(),
        step,
        source,
    };
    let metadata =
        fs::symlink_metadata(path).map_err(|error| failed(StaleSocketStep::Inspect, error))?;
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::UnixNotSocket {
            path: path.to_owned(),
        });
    }
    match UnixStream::connect(path) {
        Ok(_live) => Err(ListenerError::UnixInUse {
            path: path.to_owned(),
        }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            warn!(
                target: TRANSPORT_TARGET,
                path = %path.display(),
                "replacing stale unix socket"
            );
            fs::remove_file(path).map_err(|error| failed(StaleSocketStep::Remove, error))
        }
        Err(error) => Err(failed(StaleSocketStep::Probe, error)),
    }
}
