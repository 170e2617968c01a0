//! The shared point set and the queue of commands waiting for it.

mod document;
mod point;
mod queue;

pub use document::{Document, DocumentError};
pub use point::{POINT_EPSILON, Point, PointParseError};
pub use queue::{CommandQueue, PendingCommand};
