use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};

/// Writer that forwards each complete line to a channel.
pub(crate) struct ChannelWriter {
    partial: Vec<u8>,
    lines: Sender<String>,
}

impl ChannelWriter {
    pub(crate) fn new() -> (Self, Receiver<String>) {
        let (lines, receiver) = mpsc::channel();
        (
            Self {
                partial: Vec::new(),
                lines,
            },
            receiver,
        )
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);
        while let Some(end) = self.partial.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            let text = String::from_utf8_lossy(&line).trim_end().to_owned();
            self.lines
                .send(text)
                .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
