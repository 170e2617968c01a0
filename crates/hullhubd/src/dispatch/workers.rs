//! One blocking worker thread per connection.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::lock_unpoisoned;
use crate::transport::ConnectionStream;

use super::{
    CancelToken, DISPATCH_TARGET, DispatchCore, DispatchError, Flow, OnReadable, Token,
    guarded_close, guarded_readable,
};

/// Dispatch core that gives every connection its own thread.
///
/// Workers block on reads bounded by the read timeout, so a cancelled worker
/// notices within one timeout even if shutting the socket down did not wake
/// it. Stopping a worker cancels it, shuts its socket down and joins it.
pub struct WorkerPerConnection {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    workers: Mutex<HashMap<Token, Worker>>,
    accepting: AtomicBool,
    next_token: AtomicU64,
    read_timeout: Duration,
    write_timeout: Duration,
}

struct Worker {
    stream: Arc<ConnectionStream>,
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

impl WorkerPerConnection {
    /// Creates a stopped pool whose sockets use the given I/O timeouts.
    #[must_use]
    pub fn new(read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                workers: Mutex::new(HashMap::new()),
                accepting: AtomicBool::new(false),
                next_token: AtomicU64::new(1),
                read_timeout,
                write_timeout,
            }),
        }
    }

    /// Stops a single worker: cancel, shut the socket down, join.
    /// Returns `false` when the token is unknown.
    pub fn stop(&self, token: Token) -> bool {
        let removed = lock_unpoisoned(&self.shared.workers).remove(&token);
        let Some(worker) = removed else {
            return false;
        };
        worker.interrupt();
        if worker.join().is_err() {
            warn!(target: DISPATCH_TARGET, token = %token, "worker panicked");
        }
        true
    }
}

impl DispatchCore for WorkerPerConnection {
    fn register(
        &self,
        stream: ConnectionStream,
        handler: Arc<dyn OnReadable>,
    ) -> Result<Token, DispatchError> {
        let configure = |source| DispatchError::Configure { source };
        stream.set_nonblocking(false).map_err(configure)?;
        stream
            .set_read_timeout(Some(self.shared.read_timeout))
            .map_err(configure)?;
        stream
            .set_write_timeout(Some(self.shared.write_timeout))
            .map_err(configure)?;

        let stream = Arc::new(stream);
        let cancel = CancelToken::new();
        // Held across the spawn so a fast worker cannot look itself up
        // before it has been recorded.
        let mut workers = lock_unpoisoned(&self.shared.workers);
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(DispatchError::NotRunning);
        }
        let token = Token::new(self.shared.next_token.fetch_add(1, Ordering::SeqCst));
        let thread = {
            let shared = Arc::clone(&self.shared);
            let stream = Arc::clone(&stream);
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("hullhub-{token}"))
                .spawn(move || shared.run_worker(token, &stream, handler.as_ref(), &cancel))
                .map_err(|source| DispatchError::Spawn {
                    role: "worker",
                    source,
                })?
        };
        workers.insert(
            token,
            Worker {
                stream,
                cancel,
                thread,
            },
        );
        debug!(target: DISPATCH_TARGET, token = %token, "worker started");
        Ok(token)
    }

    fn deregister(&self, token: Token) -> bool {
        self.stop(token)
    }

    fn start_all(&self) -> Result<(), DispatchError> {
        self.shared.accepting.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_all(&self) -> Result<(), DispatchError> {
        let drained: Vec<(Token, Worker)> = {
            let mut workers = lock_unpoisoned(&self.shared.workers);
            self.shared.accepting.store(false, Ordering::SeqCst);
            workers.drain().collect()
        };
        for (_, worker) in &drained {
            worker.interrupt();
        }
        let mut panicked = false;
        for (token, worker) in drained {
            if worker.join().is_err() {
                warn!(target: DISPATCH_TARGET, token = %token, "worker panicked");
                panicked = true;
            }
        }
        if panicked {
            Err(DispatchError::ThreadPanic { role: "worker" })
        } else {
            Ok(())
        }
    }

    fn active(&self) -> usize {
        lock_unpoisoned(&self.shared.workers).len()
    }
}

impl PoolShared {
    fn run_worker(
        &self,
        token: Token,
        stream: &ConnectionStream,
        handler: &dyn OnReadable,
        cancel: &CancelToken,
    ) {
        while !cancel.is_cancelled() {
            match guarded_readable(token, handler, stream) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => break,
                Err(error) => {
                    if !cancel.is_cancelled() {
                        warn!(
                            target: DISPATCH_TARGET,
                            token = %token,
                            error = %error,
                            "handler failed"
                        );
                    }
                    break;
                }
            }
        }
        guarded_close(token, handler);
        stream.close();
        // Drops our own handle when the session ended by itself; after a stop
        // the entry is already gone and the stopper joins us.
        lock_unpoisoned(&self.workers).remove(&token);
        debug!(
            target: DISPATCH_TARGET,
            token = %token,
            cancelled = cancel.is_cancelled(),
            "worker finished"
        );
    }
}

impl Worker {
    fn interrupt(&self) {
        self.cancel.cancel();
        self.stream.close();
    }

    fn join(self) -> thread::Result<()> {
        if self.thread.thread().id() == thread::current().id() {
            return Ok(());
        }
        self.thread.join()
    }
}
