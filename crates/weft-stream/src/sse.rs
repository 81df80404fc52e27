//! SSE frame reassembly.
//!
//! Frames are one or more `data: <payload>` lines terminated by a blank
//! line. Chunks may split a frame (or a UTF-8 sequence) at any byte
//! boundary, so bytes are buffered until a complete frame is present.

/// Sentinel payload that ends the stream without emitting an event.
pub const DONE_SENTINEL: &str = "[DONE]";

const FRAME_SEPARATOR: &[u8] = b"\n\n";

/// Reassembles `data:` payloads out of an arbitrarily-chunked byte stream.
#[derive(Debug, Default)]
pub struct SseFrameBuffer {
    buf: Vec<u8>,
}

impl SseFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every frame it completes, in order. Each
    /// returned string is the frame's `data:` lines joined with `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = find_separator(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..pos + FRAME_SEPARATOR.len()).collect();
            let frame = String::from_utf8_lossy(&frame);
            if let Some(payload) = frame_payload(&frame) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Best-effort payload of a non-empty trailing partial frame at stream
    /// end.
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buf);
        frame_payload(rest.trim())
    }
}

fn find_separator(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_SEPARATOR.len())
        .position(|window| window == FRAME_SEPARATOR)
}

/// Join the frame's `data:` lines; `None` when the frame carries no data
/// lines (comments, heartbeats, stray blank lines).
fn frame_payload(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| {
            let rest = line.strip_prefix("data:")?;
            Some(rest.strip_prefix(' ').unwrap_or(rest))
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
