//!
//! Incremental event-stream scanner for upstream response bodies.
//!
//! Reassembles logical event lines from arbitrary transport byte chunks,
//! strips the SSE `data:` prefix with explicit bounds checks, and detects the
//! `[DONE]` termination sentinel. Payloads are handed to the active adapter's
//! classify step; framing noise (short lines, unprefixed lines) is discarded
//! here so a single corrupt event never aborts the whole stream.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use crate::error::{ProxyError, Result};

/* --- constants ------------------------------------------------------------------------------ */

/** Event lines shorter than this cannot carry a payload and are discarded */
const MIN_EVENT_LEN: usize = 6;

/** SSE event prefix expected on every data line */
const DATA_PREFIX: &str = "data:";

/** Stream termination sentinel */
const DONE_SENTINEL: &str = "[DONE]";

/** Maximum size of a single buffered event line (10 MiB) */
pub const MAX_EVENT_BYTES: usize = 10 << 20;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Incremental line scanner over an upstream event stream.
///
/// Fed transport chunks in arrival order; yields complete event payloads and
/// buffers any unterminated tail until the next chunk. Single consumption:
/// once the sentinel is observed all further input is ignored.
#[derive(Debug, Default)]
pub struct EventScanner {
    /** unterminated tail of the last chunk */
    buffer: Vec<u8>,
    /** set once the termination sentinel has been observed */
    finished: bool,
}

/* --- start of code -------------------------------------------------------------------------- */

impl EventScanner {
    ///
    /// Create a new scanner with an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Whether the termination sentinel has been observed.
    pub fn is_done(&self) -> bool {
        self.finished
    }

    ///
    /// Feed one transport chunk and collect the event payloads it completes.
    ///
    /// Splits on line boundaries, keeps the unterminated tail buffered, and
    /// applies the prefix/sentinel rules to every completed line. The buffer
    /// grows as needed to admit events larger than a single chunk, but the
    /// scan fails explicitly once a single event exceeds [MAX_EVENT_BYTES]
    /// rather than silently truncating it.
    ///
    /// # Arguments
    ///  * `chunk` - raw bytes as received from the transport
    ///
    /// # Returns
    ///  * Payloads of all events completed by this chunk, in order
    ///  * `ProxyError::EventTooLarge` if a buffered line outgrows the limit
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        if self.finished {
            return Ok(Vec::new());
        }

        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..pos.min(line.len())]);

            match parse_event_line(&line) {
                Some(DONE_SENTINEL) => {
                    self.finished = true;
                    return Ok(payloads);
                }
                Some(payload) => payloads.push(payload.to_string()),
                None => {}
            }
        }

        if self.buffer.len() > MAX_EVENT_BYTES {
            return Err(ProxyError::EventTooLarge { max: MAX_EVENT_BYTES });
        }

        Ok(payloads)
    }

    ///
    /// Surface the unterminated tail once the transport has closed.
    ///
    /// Line framing waits for a line feed, but an upstream may close the
    /// connection right after the final event without sending one. The tail
    /// goes through the same prefix/sentinel rules as completed lines.
    ///
    /// # Returns
    ///  * The final event payload, or None when the tail is framing noise
    pub fn finish(&mut self) -> Option<String> {
        if self.finished || self.buffer.is_empty() {
            return None;
        }

        let tail = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&tail);
        match parse_event_line(&line) {
            Some(DONE_SENTINEL) => {
                self.finished = true;
                None
            }
            Some(payload) => Some(payload.to_string()),
            None => None,
        }
    }
}

///
/// Extract the payload from one completed event line.
///
/// A line shorter than the minimum event length is discarded; a line not
/// beginning with the `data:` prefix is discarded (a bare sentinel line is
/// the one exception). The prefix is stripped, a trailing carriage return
/// and leading spaces trimmed.
///
/// # Arguments
///  * `line` - one completed line, without its line feed
///
/// # Returns
///  * Trimmed payload, or None for framing noise
fn parse_event_line(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line == DONE_SENTINEL {
        return Some(DONE_SENTINEL);
    }
    if line.len() < MIN_EVENT_LEN {
        return None;
    }

    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(payload.trim_start_matches(' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_single_event() {
        let mut scanner = EventScanner::new();
        let payloads = scanner.push(b"data: {\"a\":1}\n").unwrap();
        assert_eq!(payloads, vec!["{\"a\":1}"]);
        assert!(!scanner.is_done());
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut scanner = EventScanner::new();
        assert!(scanner.push(b"data: {\"text\":").unwrap().is_empty());
        let payloads = scanner.push(b"\"hello\"}\nda").unwrap();
        assert_eq!(payloads, vec!["{\"text\":\"hello\"}"]);
        let payloads = scanner.push(b"ta: {\"b\":2}\n").unwrap();
        assert_eq!(payloads, vec!["{\"b\":2}"]);
    }

    #[test]
    fn test_short_line_is_discarded() {
        let mut scanner = EventScanner::new();
        let payloads = scanner.push(b"dat\ndata: {\"a\":1}\n").unwrap();
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_unprefixed_line_is_discarded() {
        let mut scanner = EventScanner::new();
        let payloads = scanner.push(b"event: ping\ndata: {\"a\":1}\n").unwrap();
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut scanner = EventScanner::new();
        let payloads = scanner.push(b"data: {\"a\":1}\r\n").unwrap();
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_done_sentinel_terminates_scan() {
        let mut scanner = EventScanner::new();
        let payloads = scanner.push(b"data: {\"a\":1}\ndata: [DONE]\ndata: {\"b\":2}\n").unwrap();
        assert_eq!(payloads, vec!["{\"a\":1}"]);
        assert!(scanner.is_done());
        // Input after the sentinel is ignored.
        assert!(scanner.push(b"data: {\"c\":3}\n").unwrap().is_empty());
    }

    #[test]
    fn test_bare_done_line_terminates_scan() {
        let mut scanner = EventScanner::new();
        scanner.push(b"[DONE]\n").unwrap();
        assert!(scanner.is_done());
    }

    #[test]
    fn test_oversized_event_fails_explicitly() {
        let mut scanner = EventScanner::new();
        let big = vec![b'x'; MAX_EVENT_BYTES + 1];
        let err = scanner.push(&big).unwrap_err();
        assert!(matches!(err, ProxyError::EventTooLarge { .. }));
    }

    #[test]
    fn test_rescan_yields_identical_sequence() {
        let input: &[u8] = b"data: one\nnoise\ndata: two\r\ndata: three\n";
        let mut first = EventScanner::new();
        let mut second = EventScanner::new();
        assert_eq!(first.push(input).unwrap(), second.push(input).unwrap());
    }

    #[test]
    fn test_finish_surfaces_unterminated_final_event() {
        let mut scanner = EventScanner::new();
        assert!(scanner.push(b"data: {\"type\":\"message_stop\"}").unwrap().is_empty());
        assert_eq!(scanner.finish().as_deref(), Some("{\"type\":\"message_stop\"}"));
        // The tail is consumed; a second call yields nothing.
        assert!(scanner.finish().is_none());
    }

    #[test]
    fn test_finish_discards_noise_tail() {
        let mut scanner = EventScanner::new();
        scanner.push(b"event: ping").unwrap();
        assert!(scanner.finish().is_none());
    }

    #[test]
    fn test_finish_handles_unterminated_sentinel() {
        let mut scanner = EventScanner::new();
        scanner.push(b"data: [DONE]").unwrap();
        assert!(scanner.finish().is_none());
        assert!(scanner.is_done());
    }

    #[test]
    fn test_finish_with_empty_buffer_yields_nothing() {
        let mut scanner = EventScanner::new();
        scanner.push(b"data: {\"a\":1}\n").unwrap();
        assert!(scanner.finish().is_none());
    }

    #[test]
    fn test_leading_spaces_trimmed_from_payload() {
        let mut scanner = EventScanner::new();
        let payloads = scanner.push(b"data:   {\"a\":1}\n").unwrap();
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }
}
