//! Connected client sockets shared between a session's reader and writer.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

/// Stream types accepted by the listener.
///
/// All I/O goes through `&self`: a dispatch core reads while the session's
/// outbox writes through a cloned handle to the same socket.
#[derive(Debug)]
pub enum ConnectionStream {
    /// TCP client.
    Tcp(TcpStream),
    /// Unix domain socket client.
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Reads whatever is available into `buf`.
    ///
    /// # Errors
    ///
    /// Propagates socket read errors, including `WouldBlock` and `TimedOut`.
    pub fn read_chunk(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => {
                let mut stream: &TcpStream = stream;
                stream.read(buf)
            }
            Self::Unix(stream) => {
                let mut stream: &UnixStream = stream;
                stream.read(buf)
            }
        }
    }

    /// Writes part of `buf`, returning how much was accepted.
    ///
    /// # Errors
    ///
    /// Propagates socket write errors.
    pub fn write_chunk(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => {
                let mut stream: &TcpStream = stream;
                stream.write(buf)
            }
            Self::Unix(stream) => {
                let mut stream: &UnixStream = stream;
                stream.write(buf)
            }
        }
    }

    /// Opens a second handle to the same socket.
    ///
    /// # Errors
    ///
    /// Fails when the descriptor cannot be duplicated.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(match self {
            Self::Tcp(stream) => Self::Tcp(stream.try_clone()?),
            Self::Unix(stream) => Self::Unix(stream.try_clone()?),
        })
    }

    /// Switches the socket between blocking and non-blocking mode.
    ///
    /// # Errors
    ///
    /// Propagates the `fcntl` failure.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_nonblocking(nonblocking),
            Self::Unix(stream) => stream.set_nonblocking(nonblocking),
        }
    }

    /// Bounds blocking reads.
    ///
    /// # Errors
    ///
    /// Fails for a zero duration or when the option cannot be set.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    /// Bounds blocking writes.
    ///
    /// # Errors
    ///
    /// Fails for a zero duration or when the option cannot be set.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_write_timeout(timeout),
            Self::Unix(stream) => stream.set_write_timeout(timeout),
        }
    }

    /// Shuts down both directions, waking any thread blocked on the socket.
    ///
    /// Already-disconnected sockets are ignored.
    pub fn close(&self) {
        let result = match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        if let Err(error) = result
            && error.kind() != io::ErrorKind::NotConnected
        {
            tracing::debug!(
                target: super::TRANSPORT_TARGET,
                error = %error,
                "socket shutdown failed"
            );
        }
    }

    /// Human-readable peer description for logs.
    #[must_use]
    pub fn peer_label(&self) -> String {
        match self {
            Self::Tcp(stream) => stream
                .peer_addr()
                .map_or_else(|_| "tcp:unknown".to_owned(), |addr| addr.to_string()),
            Self::Unix(_) => "unix".to_owned(),
        }
    }
}

impl AsFd for ConnectionStream {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Tcp(stream) => stream.as_fd(),
            Self::Unix(stream) => stream.as_fd(),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_chunk(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
