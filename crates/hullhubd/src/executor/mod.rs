//! Shared command execution over the single graph.
//!
//! Every session funnels its lines through one [`CommandExecutor`]. A single
//! mutex guards the document, the wait queue and each session's protocol
//! state, so every line is processed atomically against all of them. Replies
//! are collected into per-session outboxes under that lock and written only
//! after it is released.
//!
//! Ownership of the graph follows one rule: a command runs only while its
//! session holds the document. Commands arriving while another session holds
//! it join a FIFO queue and run, in arrival order, as soon as the holder lets
//! go, whichever thread happens to release it.

mod outbox;

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::geometry::hull_area;
use crate::graph::{CommandQueue, Document, DocumentError, PendingCommand, Point};
use crate::lock_unpoisoned;
use crate::monitor::ThresholdMonitor;
use crate::session::{Command, InputState, Reply, SessionError, SessionId, greeting};

use self::outbox::Outbox;

const EXECUTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::executor");

/// What the session should do after a line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Keep reading.
    Continue,
    /// The client said goodbye; close the connection.
    Close,
}

/// Owner of the shared graph and everything that coordinates access to it.
pub struct CommandExecutor {
    board: Mutex<Board>,
    monitor: Arc<ThresholdMonitor>,
    next_session: AtomicU64,
    write_timeout: Duration,
}

#[derive(Default)]
struct Board {
    document: Document,
    queue: CommandQueue,
    sessions: HashMap<SessionId, SessionRecord>,
}

struct SessionRecord {
    input: InputState,
    outbox: Arc<Outbox>,
}

impl CommandExecutor {
    /// Creates an executor that reports hull areas to `monitor`.
    #[must_use]
    pub fn new(monitor: Arc<ThresholdMonitor>, write_timeout: Duration) -> Self {
        Self {
            board: Mutex::new(Board::default()),
            monitor,
            next_session: AtomicU64::new(1),
            write_timeout,
        }
    }

    /// Upper bound on delivering one reply line.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Registers a new session and greets it through `writer`.
    ///
    /// # Errors
    ///
    /// Fails when the greeting cannot be written; the session is detached
    /// again before returning.
    pub fn attach(&self, writer: Box<dyn Write + Send>) -> Result<SessionId, SessionError> {
        let session = SessionId::new(self.next_session.fetch_add(1, Ordering::SeqCst));
        let outbox = Arc::new(Outbox::new(session, writer, self.write_timeout));
        for line in greeting(self.monitor.threshold()) {
            outbox.push(line);
        }
        self.lock_board().sessions.insert(
            session,
            SessionRecord {
                input: InputState::Normal,
                outbox: Arc::clone(&outbox),
            },
        );
        if let Err(error) = outbox.flush() {
            self.detach(session);
            return Err(error.into());
        }
        debug!(target: EXECUTOR_TARGET, session = %session, "session attached");
        Ok(session)
    }

    /// Processes one line from `session`.
    ///
    /// Blank lines are ignored. Protocol mistakes are answered with an
    /// `Error: ...` reply and do not fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Detached`] for an unknown session and
    /// [`SessionError::Io`] when this session's replies cannot be delivered.
    /// Delivery failures for other sessions are logged and left to their own
    /// connection to notice.
    pub fn handle_line(&self, session: SessionId, line: &str) -> Result<LineOutcome, SessionError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(LineOutcome::Continue);
        }
        let (outcome, touched) = {
            let mut board = self.lock_board();
            if !board.sessions.contains_key(&session) {
                return Err(SessionError::Detached(session));
            }
            let mut turn = Turn::new(&mut board, &self.monitor);
            let outcome = turn.line(session, line);
            (outcome, turn.touched)
        };
        match deliver(Some(session), &touched) {
            Some(error) => Err(error.into()),
            None => Ok(outcome),
        }
    }

    /// Forgets `session`: its queued commands are dropped, the document is
    /// released if it held it, and the queue is drained for everyone else.
    ///
    /// Points already entered for a graph under construction are kept.
    pub fn detach(&self, session: SessionId) {
        let touched = {
            let mut board = self.lock_board();
            if board.sessions.remove(&session).is_none() {
                return;
            }
            let purged = board.queue.purge(session);
            let released = board.document.release(session);
            let mut turn = Turn::new(&mut board, &self.monitor);
            turn.drain();
            debug!(
                target: EXECUTOR_TARGET,
                session = %session,
                purged,
                released,
                "session detached"
            );
            turn.touched
        };
        deliver(None, &touched);
    }

    /// Releases a document lock whose holder is no longer attached and runs
    /// whatever the queue still holds. Returns the stale holder, if any.
    pub fn recover(&self) -> Option<SessionId> {
        let (stale, touched) = {
            let mut board = self.lock_board();
            let stale = board
                .document
                .holder()
                .filter(|holder| !board.sessions.contains_key(holder));
            if let Some(holder) = stale {
                board.document.release(holder);
                warn!(
                    target: EXECUTOR_TARGET,
                    session = %holder,
                    "released graph held by a departed session"
                );
            }
            let mut turn = Turn::new(&mut board, &self.monitor);
            turn.drain();
            (stale, turn.touched)
        };
        deliver(None, &touched);
        stale
    }

    /// Snapshot of the graph.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.lock_board().document.points().to_vec()
    }

    /// Session currently holding the document.
    #[must_use]
    pub fn lock_holder(&self) -> Option<SessionId> {
        self.lock_board().document.holder()
    }

    /// Waiting commands as `(session, text)`, oldest first.
    #[must_use]
    pub fn queued(&self) -> Vec<(SessionId, String)> {
        self.lock_board()
            .queue
            .iter()
            .map(|pending| (pending.session, pending.raw.clone()))
            .collect()
    }

    /// Protocol state of an attached session.
    #[must_use]
    pub fn input_state(&self, session: SessionId) -> Option<InputState> {
        self.lock_board()
            .sessions
            .get(&session)
            .map(|record| record.input)
    }

    /// Number of attached sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock_board().sessions.len()
    }

    fn lock_board(&self) -> MutexGuard<'_, Board> {
        lock_unpoisoned(&self.board)
    }
}

/// Flushes every touched outbox. Returns the acting session's own failure.
fn deliver(acting: Option<SessionId>, touched: &[Arc<Outbox>]) -> Option<io::Error> {
    let mut own = None;
    for outbox in touched {
        let Err(error) = outbox.flush() else {
            continue;
        };
        if Some(outbox.session()) == acting {
            own = Some(error);
        } else {
            warn!(
                target: EXECUTOR_TARGET,
                session = %outbox.session(),
                error = %error,
                "failed to deliver reply"
            );
        }
    }
    own
}

/// One pass over the board while its lock is held.
struct Turn<'a> {
    board: &'a mut Board,
    monitor: &'a ThresholdMonitor,
    touched: Vec<Arc<Outbox>>,
}

impl<'a> Turn<'a> {
    fn new(board: &'a mut Board, monitor: &'a ThresholdMonitor) -> Self {
        Self {
            board,
            monitor,
            touched: Vec::new(),
        }
    }

    fn line(&mut self, session: SessionId, line: &str) -> LineOutcome {
        let input = self
            .board
            .sessions
            .get(&session)
            .map_or(InputState::Normal, |record| record.input);
        match input {
            InputState::AwaitingPoints { .. } if matches!(Command::parse(line), Ok(Command::Exit)) => {
                self.reply(session, Reply::Goodbye);
                LineOutcome::Close
            }
            InputState::AwaitingPoints { expected, received } => {
                self.accept_point(session, line, expected, received);
                LineOutcome::Continue
            }
            InputState::Normal => self.command(session, line),
        }
    }

    fn command(&mut self, session: SessionId, line: &str) -> LineOutcome {
        match Command::parse(line) {
            Err(error) => {
                self.reply(session, Reply::Error(error.to_string()));
                LineOutcome::Continue
            }
            Ok(Command::Exit) => {
                self.reply(session, Reply::Goodbye);
                LineOutcome::Close
            }
            Ok(command) => {
                self.submit(session, command, line);
                LineOutcome::Continue
            }
        }
    }

    fn submit(&mut self, session: SessionId, command: Command, raw: &str) {
        self.drain();
        let reentrant = self.board.document.holder() == Some(session);
        if self.board.document.try_acquire(session) {
            self.execute(session, command, reentrant);
            self.drain();
            return;
        }
        let position = self.board.queue.enqueue(PendingCommand {
            session,
            command,
            raw: raw.to_owned(),
        });
        debug!(
            target: EXECUTOR_TARGET,
            session = %session,
            position,
            command = raw,
            "command queued"
        );
        self.reply(session, Reply::Queued(position));
    }

    /// Runs queued commands until the queue empties or one of them keeps the
    /// document locked.
    fn drain(&mut self) {
        while !self.board.document.is_locked() {
            let Some(pending) = self.board.queue.pop_front() else {
                break;
            };
            if !self.board.sessions.contains_key(&pending.session) {
                continue;
            }
            if self.board.document.try_acquire(pending.session) {
                debug!(
                    target: EXECUTOR_TARGET,
                    session = %pending.session,
                    command = %pending.raw,
                    "running queued command"
                );
                self.execute(pending.session, pending.command, false);
            }
        }
    }

    /// Runs a command whose session holds the document. `reentrant` means
    /// the session already held it before this command, in which case the
    /// lock is left as it was.
    fn execute(&mut self, session: SessionId, command: Command, reentrant: bool) {
        match command {
            Command::NewGraph(count) => self.start_graph(session, count),
            Command::Hull => {
                let area = hull_area(self.board.document.points());
                self.reply(session, Reply::Area(area));
                self.finish(session, reentrant);
                self.monitor.update(area);
            }
            Command::NewPoint(point) => {
                match self.board.document.push(session, point) {
                    Ok(()) => self.reply(session, Reply::PointAdded),
                    Err(error) => self.refuse(session, &error),
                }
                self.finish(session, reentrant);
            }
            Command::RemovePoint(point) => {
                match self.board.document.remove_matching(session, &point) {
                    Ok(true) => self.reply(session, Reply::PointRemoved),
                    Ok(false) => self.reply(session, Reply::PointNotFound),
                    Err(error) => self.refuse(session, &error),
                }
                self.finish(session, reentrant);
            }
            // Answered before submission; never queued.
            Command::Exit => self.finish(session, reentrant),
        }
    }

    fn start_graph(&mut self, session: SessionId, count: usize) {
        if let Err(error) = self.board.document.clear(session) {
            self.refuse(session, &error);
            return;
        }
        self.set_input(
            session,
            InputState::AwaitingPoints {
                expected: count,
                received: 0,
            },
        );
        info!(
            target: EXECUTOR_TARGET,
            session = %session,
            points = count,
            "graph replacement started"
        );
        self.reply(session, Reply::EnterPoints(count));
    }

    fn accept_point(&mut self, session: SessionId, line: &str, expected: usize, received: usize) {
        let point = match Point::parse(line) {
            Ok(point) => point,
            Err(error) => {
                self.reply(session, Reply::Error(error.to_string()));
                return;
            }
        };
        if let Err(error) = self.board.document.push(session, point) {
            self.set_input(session, InputState::Normal);
            self.refuse(session, &error);
            return;
        }
        let received = received + 1;
        self.reply(session, Reply::PointAccepted(received));
        if received < expected {
            self.set_input(session, InputState::AwaitingPoints { expected, received });
            return;
        }

        self.set_input(session, InputState::Normal);
        self.reply(session, Reply::GraphCreated(received));
        self.board.document.release(session);
        let area = hull_area(self.board.document.points());
        info!(
            target: EXECUTOR_TARGET,
            session = %session,
            points = received,
            area,
            "graph replaced"
        );
        self.monitor.update(area);
        self.drain();
    }

    fn finish(&mut self, session: SessionId, reentrant: bool) {
        if !reentrant {
            self.board.document.release(session);
        }
    }

    fn set_input(&mut self, session: SessionId, input: InputState) {
        if let Some(record) = self.board.sessions.get_mut(&session) {
            record.input = input;
        }
    }

    fn refuse(&mut self, session: SessionId, error: &DocumentError) {
        warn!(
            target: EXECUTOR_TARGET,
            session = %session,
            error = %error,
            "graph mutation refused"
        );
        self.reply(session, Reply::Error(error.to_string()));
    }

    fn reply(&mut self, session: SessionId, reply: Reply) {
        let Some(record) = self.board.sessions.get(&session) else {
            return;
        };
        record.outbox.push(reply.to_string());
        if !self
            .touched
            .iter()
            .any(|outbox| Arc::ptr_eq(outbox, &record.outbox))
        {
            self.touched.push(Arc::clone(&record.outbox));
        }
    }
}
