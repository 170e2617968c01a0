//! Shared helpers for unit and behavioural suites.

mod client;
mod reporter;
mod sink;
mod writer;

pub(crate) use self::client::LineClient;
pub(crate) use self::reporter::{HealthEvent, RecordingHealthReporter};
pub(crate) use self::sink::RecordingCrossingSink;
pub(crate) use self::writer::ChannelWriter;

use std::time::{Duration, Instant};

/// How long a test waits for a line the server should send.
pub(crate) const REPLY_TIMEOUT: Duration = Duration::from_secs(3);

/// Polls `condition` until it holds or [`REPLY_TIMEOUT`] elapses.
pub(crate) fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + REPLY_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
