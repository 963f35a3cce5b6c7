//! Incremental `text/event-stream` decoder.
//!
//! ```rust
//! use gstream::{FrameKind, FrameParser};
//!
//! let mut parser = FrameParser::new();
//! assert!(parser.feed(b"data: hello").is_empty());
//!
//! let events = parser.feed(b"\n\ndata: [DONE]\n\n");
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[0].payload, "hello");
//! assert_eq!(events[1].kind, FrameKind::Sentinel);
//! ```

pub const DONE_SENTINEL: &str = "[DONE]";

const BYTE_ORDER_MARK: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Sentinel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub kind: FrameKind,
    pub payload: String,
}

impl FrameEvent {
    pub fn data(payload: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Data,
            payload: payload.into(),
        }
    }

    pub fn sentinel() -> Self {
        Self {
            kind: FrameKind::Sentinel,
            payload: DONE_SENTINEL.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.kind == FrameKind::Sentinel
    }
}

/// Decoder state for one connection.
///
/// Bytes are buffered until a full line is available, and `data` lines are
/// held until the blank line that terminates their record. Create a new parser
/// for every connection; state does not carry over meaningfully between
/// streams.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
    started: bool,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk and returns every record completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<FrameEvent> {
        let mut events = Vec::new();
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = buffer[start..].iter().position(|byte| *byte == b'\n') {
            let end = start + offset;
            let line = &buffer[start..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
            start = end + 1;
        }

        buffer.drain(..start);
        self.buffer = buffer;
        events
    }

    /// Bytes received after the last complete line.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a record has started but not yet been terminated.
    pub fn has_pending_record(&self) -> bool {
        !self.buffer.is_empty() || !self.data_lines.is_empty()
    }

    fn process_line(&mut self, line: &[u8]) -> Option<FrameEvent> {
        let line = if self.started {
            line
        } else {
            self.started = true;
            line.strip_prefix(BYTE_ORDER_MARK).unwrap_or(line)
        };

        if line.is_empty() {
            return self.dispatch();
        }

        if line[0] == b':' {
            return None;
        }

        let (field, value) = match line.iter().position(|byte| *byte == b':') {
            Some(index) => {
                let value = &line[index + 1..];
                (&line[..index], value.strip_prefix(b" ").unwrap_or(value))
            }
            None => (line, &[][..]),
        };

        if field == b"data" {
            self.data_lines
                .push(String::from_utf8_lossy(value).into_owned());
        }

        None
    }

    fn dispatch(&mut self) -> Option<FrameEvent> {
        if self.data_lines.is_empty() {
            return None;
        }

        let payload = self.data_lines.join("\n");
        self.data_lines.clear();

        if payload.is_empty() {
            return None;
        }

        if payload == DONE_SENTINEL {
            Some(FrameEvent::sentinel())
        } else {
            Some(FrameEvent::data(payload))
        }
    }
}
