use super::SessionError;

/// Longest line a client may send before the session is dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reassembles newline-terminated lines from arbitrary read chunks.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    /// Creates a buffer that rejects lines longer than `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    /// Appends `bytes` and returns every line they complete, in order.
    ///
    /// Lines are decoded lossily and trimmed, so `\r\n` endings and stray
    /// padding are tolerated. An incomplete tail stays buffered.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::LineTooLong`] when the unterminated tail grows
    /// past the limit.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<Vec<String>, SessionError> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&raw).trim().to_owned());
        }
        if self.pending.len() > self.limit {
            self.pending.clear();
            return Err(SessionError::LineTooLong { limit: self.limit });
        }
        Ok(lines)
    }

    /// Bytes held back waiting for a newline.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}
