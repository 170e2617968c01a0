//! Handlers and socket helpers for dispatch tests.

use std::io::{self, Read};
use std::net::{TcpListener, TcpStream};
use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use crate::session::SessionError;
use crate::transport::ConnectionStream;

use super::{DispatchCore, Flow, OnReadable, Token};

/// Accepted server side plus the connected client.
pub(super) fn socket_pair() -> (ConnectionStream, TcpStream) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind loopback");
    let client = TcpStream::connect(listener.local_addr().expect("addr")).expect("connect");
    client
        .set_read_timeout(Some(Duration::from_secs(3)))
        .expect("client timeout");
    let (server, _) = listener.accept().expect("accept");
    (ConnectionStream::Tcp(server), client)
}

/// Reads from `client` until EOF or an error; `true` on a clean EOF.
pub(super) fn sees_eof(client: &mut TcpStream) -> bool {
    let mut buf = [0_u8; 64];
    loop {
        match client.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => {}
            Err(error) => return error.kind() == io::ErrorKind::ConnectionReset,
        }
    }
}

fn read_available(stream: &ConnectionStream, buf: &mut [u8]) -> Result<Option<usize>, SessionError> {
    match stream.read_chunk(buf) {
        Ok(read) => Ok(Some(read)),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
}

/// Echoes input back; closes on `bye` or EOF.
#[derive(Default)]
pub(super) struct EchoHandler {
    closes: AtomicUsize,
}

impl EchoHandler {
    pub(super) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl OnReadable for EchoHandler {
    fn on_readable(&self, stream: &ConnectionStream) -> Result<Flow, SessionError> {
        let mut buf = [0_u8; 256];
        let Some(read) = read_available(stream, &mut buf)? else {
            return Ok(Flow::Continue);
        };
        let data = buf.get(..read).unwrap_or_default();
        if read == 0 || data.windows(3).any(|window| window == b"bye") {
            return Ok(Flow::Close);
        }
        let mut remaining = data;
        while !remaining.is_empty() {
            match stream.write_chunk(remaining) {
                Ok(written) => remaining = remaining.get(written..).unwrap_or_default(),
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(Flow::Continue)
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Panics as soon as input arrives.
#[derive(Default)]
pub(super) struct PanickingHandler {
    closes: AtomicUsize,
}

impl PanickingHandler {
    pub(super) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl OnReadable for PanickingHandler {
    fn on_readable(&self, stream: &ConnectionStream) -> Result<Flow, SessionError> {
        let mut buf = [0_u8; 16];
        if read_available(stream, &mut buf)?.is_some() {
            panic!("handler failure under test");
        }
        Ok(Flow::Continue)
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deregisters its own token from inside the callback.
pub(super) struct SelfDeregistering {
    core: Arc<dyn DispatchCore>,
    token: OnceLock<Token>,
    closes: AtomicUsize,
}

impl SelfDeregistering {
    pub(super) fn new(core: Arc<dyn DispatchCore>) -> Self {
        Self {
            core,
            token: OnceLock::new(),
            closes: AtomicUsize::new(0),
        }
    }

    pub(super) fn bind(&self, token: Token) {
        self.token.set(token).expect("token bound once");
    }

    pub(super) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl OnReadable for SelfDeregistering {
    fn on_readable(&self, stream: &ConnectionStream) -> Result<Flow, SessionError> {
        let mut buf = [0_u8; 16];
        if read_available(stream, &mut buf)?.is_some()
            && let Some(token) = self.token.get()
        {
            assert!(self.core.deregister(*token), "own token should be known");
        }
        Ok(Flow::Continue)
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
