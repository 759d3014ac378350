//! Incremental `text/event-stream` decoder.
//!
//! Bytes arrive in arbitrary chunks; frames are emitted once their
//! terminating blank line has been seen. Lines are assembled as bytes and
//! only then decoded as UTF-8, so a multi-byte character split across two
//! chunks is never mangled.
//!
//! A UTF-8 byte order mark at the very start of the stream is dropped.
//!
//! Handled fields: `data` (multi-line, joined with `\n`), `event`, `id`.
//! `retry` and unknown fields are ignored, as are `:` comment lines (servers
//! use them as keep-alive pings).

/// One dispatched server-sent event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// The `event:` name, if the server set one.
    pub event: Option<String>,
    /// The joined `data:` lines.
    pub data: String,
    /// The last `id:` seen on the stream.
    pub id: Option<String>,
}

impl SseFrame {
    /// A frame carrying only data.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }
}

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Leading bytes matched against [`BOM`] so far.
    bom_matched: usize,
    started: bool,
    line: Vec<u8>,
    after_cr: bool,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if !self.started {
                let matched = self.bom_matched;
                if byte == BOM[matched] {
                    self.bom_matched += 1;
                    self.started = self.bom_matched == BOM.len();
                    continue;
                }
                // Not a BOM after all: replay the partial match.
                self.started = true;
                for &b in &BOM[..matched] {
                    self.push_byte(b, &mut frames);
                }
            }
            self.push_byte(byte, &mut frames);
        }
        frames
    }

    fn push_byte(&mut self, byte: u8, frames: &mut Vec<SseFrame>) {
        if self.after_cr {
            self.after_cr = false;
            if byte == b'\n' {
                return;
            }
        }
        match byte {
            b'\n' => self.end_line(frames),
            b'\r' => {
                self.end_line(frames);
                self.after_cr = true;
            }
            _ => self.line.push(byte),
        }
    }

    fn end_line(&mut self, frames: &mut Vec<SseFrame>) {
        let raw = std::mem::take(&mut self.line);
        if raw.is_empty() {
            if let Some(frame) = self.dispatch() {
                frames.push(frame);
            }
            return;
        }
        let line = String::from_utf8_lossy(&raw);
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };
        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        Some(SseFrame {
            event: event.filter(|e| !e.is_empty()),
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b"event: state\ndata: {\"type\":\"log\"}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("state".into()),
                data: r#"{"type":"log"}"#.into(),
                id: None,
            }]
        );
    }

    #[test]
    fn test_incomplete_frame_waits() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: par").is_empty());
        assert!(dec.feed(b"tial\n").is_empty());
        assert_eq!(dec.feed(b"\n"), vec![SseFrame::data("partial")]);
    }

    #[test]
    fn test_multiline_data() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b"data: one\ndata:two\n\n");
        assert_eq!(frames, vec![SseFrame::data("one\ntwo")]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: a\r").is_empty());
        let frames = dec.feed(b"\n\r\n");
        assert_eq!(frames, vec![SseFrame::data("a")]);
    }

    #[test]
    fn test_bare_cr_line_endings() {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.feed(b"data: x\r\r"), vec![SseFrame::data("x")]);
    }

    #[test]
    fn test_comments_and_retry_ignored() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b": ping\n\nretry: 5000\n\ndata: y\n\n");
        assert_eq!(frames, vec![SseFrame::data("y")]);
    }

    #[test]
    fn test_event_without_data_is_not_dispatched() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"event: state\n\n").is_empty());
        // The event name does not leak into the next frame.
        assert_eq!(dec.feed(b"data: z\n\n"), vec![SseFrame::data("z")]);
    }

    #[test]
    fn test_empty_data_line_dispatches_empty_frame() {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.feed(b"data:\n\n"), vec![SseFrame::data("")]);
    }

    #[test]
    fn test_id_persists() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b"id: 7\ndata: a\n\ndata: b\n\n");
        assert_eq!(frames[0].id.as_deref(), Some("7"));
        assert_eq!(frames[1].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_leading_bom_stripped() {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.feed(b"\xEF\xBB\xBFdata: a\n\n"), vec![SseFrame::data("a")]);
    }

    #[test]
    fn test_leading_bom_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"\xEF").is_empty());
        assert!(dec.feed(b"\xBB\xBFdata: ").is_empty());
        assert_eq!(dec.feed(b"b\n\n"), vec![SseFrame::data("b")]);
    }

    #[test]
    fn test_only_first_bom_stripped() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed("data: x\n\n\u{FEFF}data: y\n\n".as_bytes());
        // A BOM mid-stream is part of the field name, so that frame is ignored.
        assert_eq!(frames, vec![SseFrame::data("x")]);
    }

    #[test]
    fn test_partial_bom_prefix_is_replayed() {
        let mut dec = SseDecoder::new();
        // 0xEF followed by a non-BOM byte stays in the line as data.
        let frames = dec.feed(b"\xEF\n\ndata: z\n\n");
        assert_eq!(frames, vec![SseFrame::data("z")]);
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b"\xEFdata: q\n\n");
        assert!(frames.is_empty());
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let text = "data: ü\n\n".as_bytes();
        // 'ü' is two bytes; split between them.
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut dec = SseDecoder::new();
        assert!(dec.feed(&text[..split]).is_empty());
        assert_eq!(dec.feed(&text[split..]), vec![SseFrame::data("ü")]);
    }
}
