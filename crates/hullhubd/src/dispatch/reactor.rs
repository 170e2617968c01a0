//! Single-threaded readiness loop over `poll(2)`.

use std::collections::BTreeMap;
use std::os::fd::AsFd;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, poll};
use tracing::{debug, info, warn};

use crate::lock_unpoisoned;
use crate::transport::ConnectionStream;

use super::{
    DISPATCH_TARGET, DispatchCore, DispatchError, Flow, OnReadable, Token, guarded_close,
    guarded_readable,
};

/// Dispatch core with one control thread multiplexing every connection.
///
/// Each pass snapshots the registration table, polls the snapshot for input
/// with the configured timeout and runs the handlers of ready sockets one at
/// a time. No table lock is held while a handler runs, so handlers may
/// register or deregister freely. A registration removed earlier in the same
/// pass is skipped.
pub struct ReadinessLoop {
    shared: Arc<LoopShared>,
    control: Mutex<Option<JoinHandle<()>>>,
}

struct LoopShared {
    registrations: Mutex<BTreeMap<Token, Registration>>,
    running: AtomicBool,
    next_token: AtomicU64,
    poll_interval: Duration,
}

#[derive(Clone)]
struct Registration {
    stream: Arc<ConnectionStream>,
    handler: Arc<dyn OnReadable>,
}

impl ReadinessLoop {
    /// Creates a stopped loop that waits at most `poll_interval` per pass.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(LoopShared {
                registrations: Mutex::new(BTreeMap::new()),
                running: AtomicBool::new(false),
                next_token: AtomicU64::new(1),
                poll_interval,
            }),
            control: Mutex::new(None),
        }
    }
}

impl DispatchCore for ReadinessLoop {
    fn register(
        &self,
        stream: ConnectionStream,
        handler: Arc<dyn OnReadable>,
    ) -> Result<Token, DispatchError> {
        if !self.shared.running.load(Ordering::SeqCst) {
            return Err(DispatchError::NotRunning);
        }
        stream
            .set_nonblocking(true)
            .map_err(|source| DispatchError::Configure { source })?;
        let token = Token::new(self.shared.next_token.fetch_add(1, Ordering::SeqCst));
        lock_unpoisoned(&self.shared.registrations).insert(
            token,
            Registration {
                stream: Arc::new(stream),
                handler,
            },
        );
        debug!(target: DISPATCH_TARGET, token = %token, "registered with readiness loop");
        Ok(token)
    }

    fn deregister(&self, token: Token) -> bool {
        self.shared.close(token, "deregistered")
    }

    fn start_all(&self) -> Result<(), DispatchError> {
        let mut control = lock_unpoisoned(&self.control);
        if control.is_some() {
            return Ok(());
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("hullhub-reactor".to_owned())
            .spawn(move || shared.run())
            .map_err(|source| {
                self.shared.running.store(false, Ordering::SeqCst);
                DispatchError::Spawn {
                    role: "reactor",
                    source,
                }
            })?;
        *control = Some(handle);
        Ok(())
    }

    fn stop_all(&self) -> Result<(), DispatchError> {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = lock_unpoisoned(&self.control).take();
        let joined = match handle {
            Some(handle) if handle.thread().id() != thread::current().id() => handle
                .join()
                .map_err(|_| DispatchError::ThreadPanic { role: "reactor" }),
            _ => Ok(()),
        };

        let remaining = std::mem::take(&mut *lock_unpoisoned(&self.shared.registrations));
        for (token, registration) in remaining {
            registration.finish(token, "dispatcher stopped");
        }
        joined
    }

    fn active(&self) -> usize {
        lock_unpoisoned(&self.shared.registrations).len()
    }
}

impl LoopShared {
    fn run(&self) {
        info!(
            target: DISPATCH_TARGET,
            poll_interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "readiness loop running"
        );
        while self.running.load(Ordering::SeqCst) {
            let snapshot: Vec<(Token, Registration)> = lock_unpoisoned(&self.registrations)
                .iter()
                .map(|(token, registration)| (*token, registration.clone()))
                .collect();
            if snapshot.is_empty() {
                thread::sleep(self.poll_interval);
                continue;
            }

            let ready = match poll_ready(&snapshot, self.poll_interval) {
                Ok(ready) => ready,
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    warn!(target: DISPATCH_TARGET, error = %errno, "poll failed");
                    thread::sleep(self.poll_interval);
                    continue;
                }
            };
            for (token, registration) in ready.into_iter().filter_map(|index| snapshot.get(index)) {
                if !lock_unpoisoned(&self.registrations).contains_key(token) {
                    continue;
                }
                self.dispatch(*token, registration);
            }
        }
        info!(target: DISPATCH_TARGET, "readiness loop stopped");
    }

    fn dispatch(&self, token: Token, registration: &Registration) {
        let reason = match guarded_readable(token, registration.handler.as_ref(), &registration.stream)
        {
            Ok(Flow::Continue) => return,
            Ok(Flow::Close) => "session ended",
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    token = %token,
                    error = %error,
                    "handler failed"
                );
                "handler error"
            }
        };
        self.close(token, reason);
    }

    fn close(&self, token: Token, reason: &'static str) -> bool {
        let removed = lock_unpoisoned(&self.registrations).remove(&token);
        match removed {
            Some(registration) => {
                registration.finish(token, reason);
                true
            }
            None => false,
        }
    }
}

impl Registration {
    fn finish(&self, token: Token, reason: &'static str) {
        guarded_close(token, self.handler.as_ref());
        self.stream.close();
        debug!(target: DISPATCH_TARGET, token = %token, reason, "connection closed");
    }
}

/// Indices into `snapshot` whose sockets reported any event.
fn poll_ready(snapshot: &[(Token, Registration)], timeout: Duration) -> nix::Result<Vec<usize>> {
    let mut fds: Vec<PollFd<'_>> = snapshot
        .iter()
        .map(|(_, registration)| PollFd::new(registration.stream.as_fd(), PollFlags::POLLIN))
        .collect();
    let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
    if poll(&mut fds, millis)? == 0 {
        return Ok(Vec::new());
    }
    Ok(fds
        .iter()
        .enumerate()
        .filter(|(_, fd)| fd.revents().is_some_and(|events| !events.is_empty()))
        .map(|(index, _)| index)
        .collect())
}
