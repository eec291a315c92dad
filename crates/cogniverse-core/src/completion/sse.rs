//! Server-sent-event framing for streamed completions.
//!
//! The endpoint emits `data: {json}` lines, each carrying
//! `{"choices": [{"delta": {"content": "..."}}]}`, and terminates with
//! `data: [DONE]`. Transport chunks do not respect line boundaries, so bytes
//! are buffered until a full line is available.

use super::error::CompletionError;
use super::TextStream;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;

/// A decoded `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// An incremental text fragment.
    Delta(String),
    /// The `[DONE]` terminator.
    Done,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

/// Parses one SSE line.
///
/// Returns `None` for anything that carries no text: comments, blank
/// lines, non-`data` fields, frames without content, and malformed JSON.
pub fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.trim().strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(err) => {
            tracing::debug!("Skipping malformed stream frame: {}", err);
            return None;
        }
    };

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(SseEvent::Delta)
}

/// Reassembles complete lines from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Returns a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
        (!line.trim().is_empty()).then_some(line)
    }
}

struct FrameState<S> {
    bytes: Pin<Box<S>>,
    lines: SseLineBuffer,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> FrameState<S> {
    fn absorb(&mut self, line: &str) {
        if self.finished {
            return;
        }
        match parse_sse_line(line) {
            Some(SseEvent::Delta(text)) => self.pending.push_back(text),
            Some(SseEvent::Done) => self.finished = true,
            None => {}
        }
    }
}

/// Turns a byte stream of SSE frames into a lazy stream of text fragments.
///
/// The stream ends at `[DONE]` or when the body ends. A transport error is
/// yielded once and ends the stream.
pub fn sse_text_stream<S, B>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, CompletionError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = FrameState {
        bytes: Box::pin(bytes),
        lines: SseLineBuffer::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for line in state.lines.push(chunk.as_ref()) {
                        state.absorb(&line);
                    }
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    if let Some(line) = state.lines.finish() {
                        state.absorb(&line);
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::TryStreamExt;

    fn frames(chunks: &[&str]) -> TextStream {
        let items: Vec<Result<Vec<u8>, CompletionError>> = chunks
            .iter()
            .map(|c| Ok(c.as_bytes().to_vec()))
            .collect();
        sse_text_stream(futures::stream::iter(items))
    }

    #[test]
    fn parses_delta_and_done() {
        let line = r#"data: {"choices": [{"delta": {"content": "Hello"}}]}"#;
        assert_eq!(parse_sse_line(line), Some(SseEvent::Delta("Hello".into())));
        assert_eq!(parse_sse_line("data: [DONE]"), Some(SseEvent::Done));
    }

    #[test]
    fn ignores_frames_without_text() {
        assert_eq!(parse_sse_line(r#"data: {"choices": [{"delta": {}}]}"#), None);
        assert_eq!(parse_sse_line(r#"data: {"choices": []}"#), None);
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("event: ping"), None);
        assert_eq!(parse_sse_line("data: {not json"), None);
    }

    #[test]
    fn line_buffer_reassembles_split_lines() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: {\"cho").is_empty());
        let lines = buf.push(b"ices\": []}\r\ndata: [DONE]\n");
        assert_eq!(lines, vec!["data: {\"choices\": []}", "data: [DONE]"]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn malformed_frame_between_good_frames_is_skipped() {
        let stream = frames(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]);
        let fragments: Vec<String> = block_on(stream.try_collect()).unwrap();
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[test]
    fn frames_after_done_are_ignored() {
        let stream = frames(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        ]);
        let fragments: Vec<String> = block_on(stream.try_collect()).unwrap();
        assert_eq!(fragments, vec!["a"]);
    }

    #[test]
    fn unterminated_final_line_is_still_read() {
        let stream = frames(&["data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}"]);
        let fragments: Vec<String> = block_on(stream.try_collect()).unwrap();
        assert_eq!(fragments, vec!["tail"]);
    }

    #[test]
    fn transport_error_ends_the_stream() {
        let items: Vec<Result<Vec<u8>, CompletionError>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n".to_vec()),
            Err(CompletionError::network("reset")),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}\n".to_vec()),
        ];
        let results: Vec<_> = block_on(sse_text_stream(futures::stream::iter(items)).collect());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Ok("x".to_string()));
        assert_eq!(results[1], Err(CompletionError::network("reset")));
    }
}
