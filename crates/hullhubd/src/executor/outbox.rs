//! Per-session reply buffers written after the executor lock is released.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::lock_unpoisoned;
use crate::session::SessionId;

const WRITE_RETRY: Duration = Duration::from_millis(1);

/// Ordered reply lines for one session plus the writer that delivers them.
///
/// Lines are queued while the executor lock is held and written by whichever
/// thread flushes next, so a slow client never stalls the shared graph.
pub(crate) struct Outbox {
    session: SessionId,
    pending: Mutex<VecDeque<String>>,
    writer: Mutex<Box<dyn Write + Send>>,
    write_timeout: Duration,
}

impl Outbox {
    pub(crate) fn new(
        session: SessionId,
        writer: Box<dyn Write + Send>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            session,
            pending: Mutex::new(VecDeque::new()),
            writer: Mutex::new(writer),
            write_timeout,
        }
    }

    pub(crate) fn session(&self) -> SessionId {
        self.session
    }

    pub(crate) fn push(&self, line: impl Into<String>) {
        let mut line = line.into();
        line.push('\n');
        lock_unpoisoned(&self.pending).push_back(line);
    }

    /// Writes every queued line in order.
    ///
    /// The writer lock serialises concurrent flushes so lines never
    /// interleave. Undelivered lines stay queued after an error.
    pub(crate) fn flush(&self) -> io::Result<()> {
        let mut writer = lock_unpoisoned(&self.writer);
        loop {
            let next = lock_unpoisoned(&self.pending).pop_front();
            let Some(line) = next else {
                break;
            };
            if let Err(error) = write_within(&mut **writer, line.as_bytes(), self.write_timeout) {
                lock_unpoisoned(&self.pending).push_front(line);
                return Err(error);
            }
        }
        writer.flush()
    }
}

/// `write_all` that tolerates non-blocking sockets for up to `budget`.
fn write_within(writer: &mut dyn Write, bytes: &[u8], budget: Duration) -> io::Result<()> {
    let deadline = Instant::now() + budget;
    let mut remaining = bytes;
    while !remaining.is_empty() {
        match writer.write(remaining) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }
            Ok(written) => remaining = remaining.get(written..).unwrap_or_default(),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "client stopped reading replies",
                    ));
                }
                thread::sleep(WRITE_RETRY);
            }
            Err(error) => return Err(error),
        }
    }
    Ok(())
}
