// Streamchat — SSE delta decoder
//
// The hard core of the crate: turns the raw chunked byte stream of a
// streamed completion response into a lazy sequence of text deltas.
//
// Two layers:
//   • `decode_line` — a pure per-line classifier returning the tri-state
//     `LineEvent` (Delta / Skip / Done), so the skip policy is testable
//     in isolation.
//   • `DeltaStream` — a pull-based `futures::Stream` adapter that
//     reassembles newline-delimited frames from arbitrary chunk
//     boundaries and feeds them through `decode_line`.
//
// Dependency rule: this module knows nothing about HTTP. client.rs hands
// it `response.bytes_stream()`; tests hand it synthetic chunk streams.

use crate::error::ChatError;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

// ── Frame grammar ──────────────────────────────────────────────────────────

/// The reserved frame signaling that no further deltas will arrive.
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// Prefix of every data-carrying frame.
const DATA_PREFIX: &str = "data: ";

// ── Per-line classification ────────────────────────────────────────────────

/// What one line of the response body means.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// The line carried one text fragment of the reply.
    Delta(String),
    /// Heartbeat, malformed payload, empty `choices`, or unrelated noise.
    /// Never an error — decoding continues with the next line.
    Skip,
    /// The terminator sentinel. No further output after this.
    Done,
}

/// Classify a single line of a streamed completion response.
///
/// Policy, in order:
///   1. A line whose trimmed form equals `data: [DONE]` terminates the
///      stream. (Trimmed comparison matches what real deployments send —
///      lines may arrive with trailing whitespace.)
///   2. A line starting with `data: ` has the prefix stripped and the
///      remainder parsed as JSON; `choices[0].delta.content` (a string)
///      becomes the delta.
///   3. Everything else — parse failure, missing field, empty `choices`
///      array, or a line without the prefix — is skipped silently.
pub fn decode_line(line: &str) -> LineEvent {
    if line.trim() == DONE_SENTINEL {
        return LineEvent::Done;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineEvent::Skip;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) else {
        return LineEvent::Skip;
    };
    match value["choices"]
        .get(0)
        .map(|choice| &choice["delta"]["content"])
        .and_then(|content| content.as_str())
    {
        Some(text) => LineEvent::Delta(text.to_string()),
        None => LineEvent::Skip,
    }
}

// ── Stream adapter ─────────────────────────────────────────────────────────

/// Lazy, finite, non-restartable sequence of deltas over a byte stream.
///
/// Frames are reassembled in a byte buffer and only converted to text once
/// a full line is present, so a multi-byte UTF-8 character split across two
/// physical chunks decodes correctly.
///
/// Two states: streaming and done. Done is terminal — it is entered on the
/// sentinel line, on exhaustion of the inner stream, or on a transport
/// error, and afterwards the stream only ever yields `None`.
pub struct DeltaStream<S> {
    inner: S,
    buf: Vec<u8>,
    done: bool,
}

impl<S> DeltaStream<S> {
    pub fn new(inner: S) -> Self {
        DeltaStream {
            inner,
            buf: Vec::new(),
            done: false,
        }
    }
}

/// Strip the line delimiter (`\n`, optionally preceded by `\r`) and decode
/// the frame bytes as UTF-8.
fn frame_text(frame: &[u8]) -> String {
    let mut end = frame.len();
    if end > 0 && frame[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && frame[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&frame[..end]).into_owned()
}

impl<S, E> Stream for DeltaStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<ChatError>,
{
    type Item = Result<String, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        loop {
            // Drain complete lines already in the buffer.
            while let Some(pos) = this.buf.iter().position(|&b| b == b'\n') {
                let frame: Vec<u8> = this.buf.drain(..=pos).collect();
                match decode_line(&frame_text(&frame)) {
                    LineEvent::Delta(text) => return Poll::Ready(Some(Ok(text))),
                    LineEvent::Skip => continue,
                    LineEvent::Done => {
                        this.done = true;
                        return Poll::Ready(None);
                    }
                }
            }

            // Need more bytes from the transport.
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.buf.extend_from_slice(&chunk),
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    // A final line may end at EOF without a newline.
                    let rest = std::mem::take(&mut this.buf);
                    if !rest.is_empty() {
                        if let LineEvent::Delta(text) = decode_line(&frame_text(&rest)) {
                            return Poll::Ready(Some(Ok(text)));
                        }
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt, TryStreamExt};
    use std::convert::Infallible;

    fn delta_line(text: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    fn chunked(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, Infallible>> + Unpin {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
    }

    async fn collect(chunks: Vec<Vec<u8>>) -> Vec<String> {
        DeltaStream::new(chunked(chunks)).try_collect().await.unwrap()
    }

    // ── decode_line ────────────────────────────────────────────────────

    #[test]
    fn classifies_terminator() {
        assert_eq!(decode_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(decode_line("  data: [DONE]  "), LineEvent::Done);
    }

    #[test]
    fn classifies_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(decode_line(line), LineEvent::Delta("Hi".into()));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let line = r#"data: {"id":"x","model":"gpt","choices":[{"index":0,"delta":{"content":"a","role":"assistant"},"finish_reason":null}]}"#;
        assert_eq!(decode_line(line), LineEvent::Delta("a".into()));
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert_eq!(decode_line("data: not-json"), LineEvent::Skip);
    }

    #[test]
    fn empty_choices_is_skipped() {
        assert_eq!(decode_line(r#"data: {"choices":[]}"#), LineEvent::Skip);
    }

    #[test]
    fn delta_without_content_is_skipped() {
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            LineEvent::Skip
        );
    }

    #[test]
    fn non_data_lines_are_skipped() {
        assert_eq!(decode_line(""), LineEvent::Skip);
        assert_eq!(decode_line(": keep-alive"), LineEvent::Skip);
        assert_eq!(decode_line("event: ping"), LineEvent::Skip);
    }

    #[test]
    fn non_string_content_is_skipped() {
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"content":42}}]}"#),
            LineEvent::Skip
        );
    }

    // ── DeltaStream ────────────────────────────────────────────────────

    #[tokio::test]
    async fn yields_single_delta_then_stops() {
        let body = format!("{}data: [DONE]\n", delta_line("Hi"));
        let deltas = collect(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[tokio::test]
    async fn deltas_concatenate_in_arrival_order() {
        let body = format!(
            "{}{}{}data: [DONE]\n",
            delta_line("Hel"),
            delta_line("lo, "),
            delta_line("world")
        );
        let deltas = collect(vec![body.into_bytes()]).await;
        assert_eq!(deltas.concat(), "Hello, world");
    }

    #[tokio::test]
    async fn stops_at_sentinel_even_with_more_lines_buffered() {
        let body = format!("{}data: [DONE]\n{}", delta_line("a"), delta_line("after"));
        let deltas = collect(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["a"]);
    }

    #[tokio::test]
    async fn malformed_lines_do_not_abort_the_stream() {
        let body = format!(
            "data: not-json\ndata: {{\"choices\":[]}}\n: keep-alive\n{}data: [DONE]\n",
            delta_line("ok")
        );
        let deltas = collect(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["ok"]);
    }

    #[tokio::test]
    async fn eof_without_sentinel_terminates_cleanly() {
        let body = format!("{}{}", delta_line("a"), delta_line("b"));
        let deltas = collect(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn final_line_without_newline_is_still_decoded() {
        let mut body = delta_line("a").into_bytes();
        let mut tail = delta_line("tail").into_bytes();
        tail.pop(); // drop the trailing '\n'
        body.extend_from_slice(&tail);
        let deltas = collect(vec![body]).await;
        assert_eq!(deltas, vec!["a", "tail"]);
    }

    #[tokio::test]
    async fn line_split_across_chunks_reassembles() {
        let body = format!("{}data: [DONE]\n", delta_line("split"));
        let bytes = body.into_bytes();
        let deltas = collect(vec![bytes[..10].to_vec(), bytes[10..].to_vec()]).await;
        assert_eq!(deltas, vec!["split"]);
    }

    #[tokio::test]
    async fn multibyte_char_split_across_chunks_decodes_correctly() {
        // "é" is two bytes in UTF-8; cut the physical chunks inside it.
        let body = format!("{}data: [DONE]\n", delta_line("caf\u{e9} au lait"));
        let cut = body.find('\u{e9}').unwrap() + 1; // one byte into the char
        let bytes = body.into_bytes();
        let deltas = collect(vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()]).await;
        assert_eq!(deltas, vec!["café au lait"]);
    }

    #[tokio::test]
    async fn crlf_framing_is_accepted() {
        let body = format!(
            "data: {}\r\ndata: [DONE]\r\n",
            serde_json::json!({"choices": [{"delta": {"content": "crlf"}}]})
        );
        let deltas = collect(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["crlf"]);
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let items: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from(delta_line("a"))),
            Err(ChatError::Transport("connection reset".into())),
        ];
        let mut s = DeltaStream::new(stream::iter(items));
        assert_eq!(s.next().await.unwrap().unwrap(), "a");
        assert!(matches!(
            s.next().await.unwrap(),
            Err(ChatError::Transport(_))
        ));
        // Done is terminal — no further output after the error.
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn nothing_after_done() {
        let body = format!("{}data: [DONE]\n", delta_line("x"));
        let mut s = DeltaStream::new(chunked(vec![body.into_bytes()]));
        assert_eq!(s.next().await.unwrap().unwrap(), "x");
        assert!(s.next().await.is_none());
        assert!(s.next().await.is_none());
    }
}
