//! Background thread that accepts clients and hands them to a dispatch core.

use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dispatch::{DispatchCore, OnAccept};

use super::{ConnectionStream, ListenerError, SocketListener, TRANSPORT_TARGET};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Runs the accept loop for a bound listener.
pub struct Acceptor {
    listener: SocketListener,
    factory: Arc<dyn OnAccept>,
    core: Arc<dyn DispatchCore>,
}

impl Acceptor {
    /// Pairs a listener with the session factory and the core that will
    /// service accepted clients.
    #[must_use]
    pub fn new(
        listener: SocketListener,
        factory: Arc<dyn OnAccept>,
        core: Arc<dyn DispatchCore>,
    ) -> Self {
        Self {
            listener,
            factory,
            core,
        }
    }

    /// Starts accepting on a background thread.
    ///
    /// # Errors
    ///
    /// Fails when the listener cannot be made non-blocking or the thread
    /// cannot be spawned. The Unix socket file is removed on failure.
    pub fn start(self) -> Result<AcceptorHandle, ListenerError> {
        if let Err(error) = self.listener.set_nonblocking() {
            self.listener.cleanup();
            return Err(error);
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let cleanup_on_error = self.listener.endpoint().clone();
        let handle = thread::Builder::new()
            .name("hullhub-accept".to_owned())
            .spawn(move || self.run(&flag))
            .map_err(|source| {
                if let Some(path) = cleanup_on_error.unix_path() {
                    let _removed = std::fs::remove_file(path.as_std_path());
                }
                ListenerError::Spawn(source)
            })?;
        Ok(AcceptorHandle {
            shutdown,
            handle: Some(handle),
        })
    }

    fn run(self, shutdown: &AtomicBool) {
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %self.listener.endpoint(),
            "socket listener active"
        );
        let mut last_error = None::<io::ErrorKind>;
        while !shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok(Some(stream)) => {
                    last_error = None;
                    self.admit(stream);
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: TRANSPORT_TARGET,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        self.listener.cleanup();
        info!(target: TRANSPORT_TARGET, "socket listener stopped");
    }

    fn admit(&self, stream: ConnectionStream) {
        let peer = stream.peer_label();
        let handler = match self.factory.on_accept(&stream) {
            Ok(handler) => handler,
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    peer = %peer,
                    error = %error,
                    "rejected connection"
                );
                stream.close();
                return;
            }
        };
        match self.core.register(stream, Arc::clone(&handler)) {
            Ok(token) => debug!(
                target: TRANSPORT_TARGET,
                peer = %peer,
                token = %token,
                "connection registered"
            ),
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    peer = %peer,
                    error = %error,
                    "failed to register connection"
                );
                handler.on_close();
            }
        }
    }
}

/// Handle to the background accept thread.
pub struct AcceptorHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AcceptorHandle {
    /// Asks the accept loop to stop at its next iteration.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for AcceptorHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
