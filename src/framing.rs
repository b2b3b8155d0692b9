//! Delimiter-based line framing.
//!
//! Inbound bytes are accumulated one at a time by [`LineFramer`] until the read
//! delimiter completes or the buffer fills up. Outbound strings get the write
//! delimiter appended by [`frame_outbound`].

/// Maximum number of bytes held in the line buffer.
pub const MAX_LINE_LEN: usize = 4096;

/// Accumulator for not-yet-delimited inbound bytes.
///
/// Multi-byte delimiters are matched as a suffix of the buffer, so `"\r\n"`
/// works the same way as `"\n"`.
#[derive(Debug, Clone)]
pub struct LineFramer {
    delimiter: Vec<u8>,
    buffer: Vec<u8>,
    max_len: usize,
}

impl LineFramer {
    /// Create a framer with the default buffer bound.
    ///
    /// Returns `None` for an empty delimiter.
    pub fn new(delimiter: impl AsRef<[u8]>) -> Option<Self> {
        Self::with_max_len(delimiter, MAX_LINE_LEN)
    }

    /// Create a framer whose buffer never exceeds `max_len` bytes.
    pub fn with_max_len(delimiter: impl AsRef<[u8]>, max_len: usize) -> Option<Self> {
        let delimiter = delimiter.as_ref().to_vec();
        if delimiter.is_empty() || max_len == 0 {
            return None;
        }
        Some(Self {
            delimiter,
            buffer: Vec::with_capacity(max_len),
            max_len,
        })
    }

    /// Feed one byte, returning a line when one is complete.
    ///
    /// A completed delimiter yields the bytes before it. A byte arriving at a
    /// full buffer is dropped and the buffer is flushed as a truncated line.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        if self.completes_delimiter(byte) {
            let keep = self.buffer.len() + 1 - self.delimiter.len();
            self.buffer.truncate(keep);
            return Some(self.take_line());
        }

        if self.buffer.len() >= self.max_len {
            return Some(self.take_line());
        }

        self.buffer.push(byte);
        None
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn completes_delimiter(&self, byte: u8) -> bool {
        match self.delimiter.split_last() {
            Some((last, head)) => byte == *last && self.buffer.ends_with(head),
            None => false,
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        line
    }
}

/// Build the bytes written for one outbound message.
pub fn frame_outbound(payload: &str, delimiter: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + delimiter.len());
    frame.extend_from_slice(payload.as_bytes());
    frame.extend_from_slice(delimiter.as_bytes());
    frame
}
