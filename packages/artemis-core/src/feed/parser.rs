//! Parser for the Artemis feed line protocol
//!
//! Each line carries four whitespace-separated tokens:
//! `<timestamp> <message> <filler> <value>`, e.g. `12.75 RED_ALERT 0 1`.
//! Lines with any other shape are not messages and are dropped without noise.

use super::event::Event;
use crate::error::ParseError;

/// Longest partial line kept between reads before it is dropped.
pub const MAX_PARTIAL_LINE: usize = 64 * 1024;

/// Parse one line, telling malformed numbers apart from non-messages.
///
/// `Ok(None)` means the line is blank or has the wrong token count.
pub fn try_parse_line(line: &str) -> Result<Option<Event>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let &[timestamp, message, _, value] = tokens.as_slice() else {
        return Ok(None);
    };

    let timestamp: f64 = timestamp.parse().map_err(|source| ParseError::Timestamp {
        token: timestamp.to_string(),
        source,
    })?;
    let value: i64 = value.parse().map_err(|source| ParseError::Value {
        token: value.to_string(),
        source,
    })?;

    Ok(Some(Event::new(timestamp, message, value)))
}

/// Parse one line, discarding anything that is not a well-formed message.
///
/// Numeric failures are logged, wrong token counts are not.
pub fn parse_line(line: &str) -> Option<Event> {
    match try_parse_line(line) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(line = line.trim(), error = %e, "discarding malformed line");
            None
        }
    }
}

/// Parse every newline-separated fragment of a chunk in isolation.
///
/// A line split across two chunks comes out as two broken fragments; use
/// [`LineParser`] to keep the tail of one read for the next.
pub fn parse_chunk(chunk: &[u8]) -> Vec<Event> {
    chunk
        .split(|&b| b == b'\n')
        .filter_map(|fragment| parse_line(&String::from_utf8_lossy(fragment)))
        .collect()
}

/// Incremental parser that buffers a trailing partial line between reads.
///
/// A line that outgrows `MAX_PARTIAL_LINE` is dropped whole: everything up to
/// and including its terminating newline is skipped.
#[derive(Debug, Default)]
pub struct LineParser {
    partial: Vec<u8>,
    discarding: bool,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes and return the events completed by it.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Vec<Event> {
        if self.discarding {
            let Some(end) = chunk.iter().position(|&b| b == b'\n') else {
                return Vec::new();
            };
            self.discarding = false;
            chunk = &chunk[end + 1..];
        }

        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.push_partial(chunk);
            return Vec::new();
        };

        let (complete, rest) = chunk.split_at(last_newline + 1);
        let events = if self.partial.is_empty() {
            parse_chunk(complete)
        } else {
            let mut joined = std::mem::take(&mut self.partial);
            joined.extend_from_slice(complete);
            parse_chunk(&joined)
        };

        self.push_partial(rest);
        events
    }

    /// Drop any buffered partial line (e.g. after the connection is replaced).
    pub fn reset(&mut self) {
        self.partial.clear();
        self.discarding = false;
    }

    /// Bytes of the current unterminated line.
    pub fn pending(&self) -> &[u8] {
        &self.partial
    }

    fn push_partial(&mut self, bytes: &[u8]) {
        if self.partial.len() + bytes.len() > MAX_PARTIAL_LINE {
            tracing::warn!(
                len = self.partial.len() + bytes.len(),
                "partial line exceeds {} bytes, dropping it",
                MAX_PARTIAL_LINE
            );
            self.partial.clear();
            self.discarding = true;
            return;
        }
        self.partial.extend_from_slice(bytes);
    }
}
