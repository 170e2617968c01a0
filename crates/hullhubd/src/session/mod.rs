//! Per-connection protocol state and the handler both dispatch strategies run.
//!
//! A session reads bytes, splits them into lines and forwards each line to the
//! [`CommandExecutor`](crate::executor::CommandExecutor). The protocol itself
//! (normal commands versus point entry after `Newgraph n`) is identical no
//! matter which strategy delivers the bytes.

mod buffer;
mod command;
mod errors;
mod handler;
mod id;
mod reply;

pub use buffer::{LineBuffer, MAX_LINE_BYTES};
pub use command::{Command, CommandError};
pub use errors::SessionError;
pub use handler::{SessionFactory, SessionHandler};
pub use id::SessionId;
pub(crate) use reply::{Reply, greeting};

/// Where a session is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputState {
    /// Each line is a command.
    #[default]
    Normal,
    /// Each line is an `x,y` point for a graph being created.
    AwaitingPoints {
        /// Points announced by `Newgraph n`.
        expected: usize,
        /// Points accepted so far.
        received: usize,
    },
}
