use std::collections::VecDeque;

use crate::session::{Command, SessionId};

/// A command deferred because another session held the document.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    /// Session that issued the command.
    pub session: SessionId,
    /// Parsed form, executed when the command reaches the front.
    pub command: Command,
    /// Text as the client sent it.
    pub raw: String,
}

/// FIFO of commands waiting for the document.
#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: VecDeque<PendingCommand>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command and returns its 1-based position.
    pub fn enqueue(&mut self, pending: PendingCommand) -> usize {
        self.entries.push_back(pending);
        self.entries.len()
    }

    /// Removes the oldest command.
    pub fn pop_front(&mut self) -> Option<PendingCommand> {
        self.entries.pop_front()
    }

    /// Drops every command issued by `session`, keeping the others in order.
    /// Returns how many were dropped.
    pub fn purge(&mut self, session: SessionId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|pending| pending.session != session);
        before - self.entries.len()
    }

    /// Number of waiting commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Waiting commands, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.entries.iter()
    }
}
