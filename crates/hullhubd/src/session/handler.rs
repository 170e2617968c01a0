//! Glue between a connection and the shared executor.

use std::io;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use crate::dispatch::{Flow, OnAccept, OnReadable};
use crate::executor::{CommandExecutor, LineOutcome};
use crate::health::HealthReporter;
use crate::lock_unpoisoned;
use crate::transport::ConnectionStream;

use super::{LineBuffer, SessionError, SessionId};

const READ_CHUNK: usize = 4096;

/// Reads one connection's bytes and feeds complete lines to the executor.
pub struct SessionHandler {
    session: SessionId,
    executor: Arc<CommandExecutor>,
    reporter: Arc<dyn HealthReporter>,
    buffer: Mutex<LineBuffer>,
    closed: AtomicBool,
}

impl SessionHandler {
    /// Wraps an already attached session.
    #[must_use]
    pub fn new(
        session: SessionId,
        executor: Arc<CommandExecutor>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            session,
            executor,
            reporter,
            buffer: Mutex::new(LineBuffer::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Session this handler drives.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl OnReadable for SessionHandler {
    fn on_readable(&self, stream: &ConnectionStream) -> Result<Flow, SessionError> {
        let mut chunk = [0_u8; READ_CHUNK];
        let read = match stream.read_chunk(&mut chunk) {
            Ok(0) => return Ok(Flow::Close),
            Ok(read) => read,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(Flow::Continue);
            }
            Err(error) => return Err(error.into()),
        };

        let lines = lock_unpoisoned(&self.buffer).extend(chunk.get(..read).unwrap_or_default())?;
        for line in lines {
            if self.executor.handle_line(self.session, &line)? == LineOutcome::Close {
                return Ok(Flow::Close);
            }
        }
        Ok(Flow::Continue)
    }

    fn on_close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.executor.detach(self.session);
        self.reporter.session_closed(self.session);
    }
}

/// Attaches each accepted connection to the executor and greets it.
pub struct SessionFactory {
    executor: Arc<CommandExecutor>,
    reporter: Arc<dyn HealthReporter>,
}

impl SessionFactory {
    /// Creates a factory producing handlers bound to `executor`.
    #[must_use]
    pub fn new(executor: Arc<CommandExecutor>, reporter: Arc<dyn HealthReporter>) -> Self {
        Self { executor, reporter }
    }
}

impl OnAccept for SessionFactory {
    fn on_accept(&self, stream: &ConnectionStream) -> Result<Arc<dyn OnReadable>, SessionError> {
        stream.set_write_timeout(Some(self.executor.write_timeout()))?;
        let writer = stream.try_clone()?;
        let session = self.executor.attach(Box::new(writer))?;
        self.reporter.session_opened(session, &stream.peer_label());
        Ok(Arc::new(SessionHandler::new(
            session,
            Arc::clone(&self.executor),
            Arc::clone(&self.reporter),
        )))
    }
}
