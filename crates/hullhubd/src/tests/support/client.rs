use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::unix::net::UnixStream;
use std::path::Path;

use super::REPLY_TIMEOUT;

/// Blocking line-oriented test client for a running service.
pub(crate) struct LineClient {
    reader: BufReader<Box<dyn Read + Send>>,
    writer: Box<dyn Write + Send>,
    hangup: Box<dyn Fn() + Send>,
}

impl LineClient {
    /// Connects over TCP and consumes the greeting.
    pub(crate) fn tcp(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect tcp client");
        stream
            .set_read_timeout(Some(REPLY_TIMEOUT))
            .expect("set read timeout");
        let reader = stream.try_clone().expect("clone tcp stream");
        let control = stream.try_clone().expect("clone tcp stream");
        Self::greeted(
            Box::new(reader),
            Box::new(stream),
            Box::new(move || {
                let _ignored = control.shutdown(Shutdown::Both);
            }),
        )
    }

    /// Connects over a Unix socket and consumes the greeting.
    pub(crate) fn unix(path: &Path) -> Self {
        let stream = UnixStream::connect(path).expect("connect unix client");
        stream
            .set_read_timeout(Some(REPLY_TIMEOUT))
            .expect("set read timeout");
        let reader = stream.try_clone().expect("clone unix stream");
        let control = stream.try_clone().expect("clone unix stream");
        Self::greeted(
            Box::new(reader),
            Box::new(stream),
            Box::new(move || {
                let _ignored = control.shutdown(Shutdown::Both);
            }),
        )
    }

    fn greeted(
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
        hangup: Box<dyn Fn() + Send>,
    ) -> Self {
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
            hangup,
        };
        assert_eq!(client.line(), "Convex Hull Server Ready");
        assert!(client.line().starts_with("Commands:"));
        assert!(client.line().starts_with("Note: Server monitors"));
        client
    }

    /// Sends one line.
    pub(crate) fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .expect("send line");
    }

    /// Reads the next line, failing the test on timeout or EOF.
    pub(crate) fn line(&mut self) -> String {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).expect("read line");
        assert!(read > 0, "server closed the connection");
        line.trim_end().to_owned()
    }

    /// Sends `line` and returns the first reply.
    pub(crate) fn ask(&mut self, line: &str) -> String {
        self.send(line);
        self.line()
    }

    /// Sends each line in turn and collects exactly one reply per line.
    pub(crate) fn script(&mut self, lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| self.ask(line)).collect()
    }

    /// Returns `true` once the server has closed the connection, skipping
    /// any lines still in flight. A read timeout counts as open.
    pub(crate) fn is_closed(&mut self) -> bool {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return true,
                Ok(_) => {}
                Err(error) => {
                    return matches!(
                        error.kind(),
                        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
                    );
                }
            }
        }
    }

    /// Drops the connection abruptly, as a crashed client would.
    pub(crate) fn hang_up(self) {
        (self.hangup)();
    }
}
