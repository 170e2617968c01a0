//! Fake service used by the client tests.
//!
//! The fake accepts one connection, greets it, echoes each line back with an
//! `echo: ` prefix and closes after `exit` or end of input.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;

#[cfg(unix)]
use std::os::unix::net::UnixListener;
#[cfg(unix)]
use std::path::Path;

use anyhow::{Context, Result, anyhow};

/// Captured client output.
#[derive(Default)]
pub(super) struct Transcript {
    pub(super) stdout: Vec<u8>,
    pub(super) stderr: Vec<u8>,
}

impl Transcript {
    pub(super) fn stdout_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stdout)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    pub(super) fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// One-shot scripted service.
pub(super) struct FakeService {
    endpoint: String,
    handle: Option<thread::JoinHandle<Result<Vec<String>>>>,
}

impl FakeService {
    pub(super) fn tcp() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake service")?;
        let port = listener.local_addr().context("local addr")?.port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().context("accept client")?;
            let reader = stream.try_clone().context("clone stream")?;
            serve(reader, stream)
        });
        Ok(Self {
            endpoint: format!("tcp://127.0.0.1:{port}"),
            handle: Some(handle),
        })
    }

    #[cfg(unix)]
    pub(super) fn unix(path: &Path) -> Result<Self> {
        let listener = UnixListener::bind(path).context("bind fake unix service")?;
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().context("accept client")?;
            let reader = stream.try_clone().context("clone stream")?;
            serve(reader, stream)
        });
        Ok(Self {
            endpoint: format!("unix://{}", path.display()),
            handle: Some(handle),
        })
    }

    pub(super) fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    /// Waits for the session to end and returns every line the client sent.
    pub(super) fn received(&mut self) -> Result<Vec<String>> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("fake service already joined"))?;
        handle
            .join()
            .map_err(|_| anyhow!("fake service thread panicked"))?
    }
}

fn serve(reader: impl Read, mut writer: impl Write) -> Result<Vec<String>> {
    writeln!(writer, "Convex Hull Server Ready").context("greet")?;
    let mut received = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line.context("read client line")?;
        if line == "exit" {
            received.push(line);
            writeln!(writer, "Goodbye!").context("say goodbye")?;
            break;
        }
        writeln!(writer, "echo: {line}").context("echo line")?;
        received.push(line);
    }
    Ok(received)
}
