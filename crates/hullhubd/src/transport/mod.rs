//! Socket plumbing: binding endpoints, accepting clients and the stream type
//! the dispatch cores drive.

mod acceptor;
mod errors;
mod listener;
mod stream;

pub use self::acceptor::{Acceptor, AcceptorHandle};
pub use self::errors::{ListenerError, StaleSocketStep};
pub use self::listener::SocketListener;
pub use self::stream::ConnectionStream;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
