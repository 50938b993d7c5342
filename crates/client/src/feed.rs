//! Decoding of the ledger service's Server-Sent Events stream.

use serde::Deserialize;
use serde_json::Value;

use peerpay_events::LedgerUpdate;

/// One dispatched SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE parser. Feed it raw body chunks in arrival order.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buf.drain(..end + 2).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines = Vec::new();

    for line in raw.lines() {
        // Comment lines carry keep-alives.
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => frame.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

/// A decoded message from the ledger stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// Identifier the server assigned to this connection.
    ClientId(String),
    Update(LedgerUpdate),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: Value,
}

impl FeedMessage {
    /// Decode a frame; unknown message types yield `None`.
    pub fn from_frame(frame: &SseFrame) -> Result<Option<Self>, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(&frame.data)?;
        match envelope.kind.as_str() {
            "client_id" => Ok(Some(FeedMessage::ClientId(match envelope.data {
                Value::String(s) => s,
                other => other.to_string(),
            }))),
            "accounts" | "transfers" => {
                let update: LedgerUpdate = serde_json::from_str(&frame.data)?;
                Ok(Some(FeedMessage::Update(update)))
            }
            other => {
                tracing::debug!(kind = other, "ignoring unknown stream message");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_chunks_are_reassembled() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: client_id\ndata: {\"type\":\"cli").is_empty());
        let frames = decoder.push(b"ent_id\",\"data\":\"abc\"}\n\n: keep-alive\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("client_id"));
        assert_eq!(
            FeedMessage::from_frame(&frames[0]).unwrap(),
            Some(FeedMessage::ClientId("abc".into()))
        );
    }

    #[test]
    fn crlf_and_multiple_frames_per_chunk() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(
            concat!(
                "event: accounts\r\ndata: {\"type\":\"accounts\",\"data\":[]}\r\n\r\n",
                "event: transfers\r\ndata: {\"type\":\"transfers\",\"data\":[]}\r\n\r\n",
            )
            .as_bytes(),
        );
        let messages: Vec<_> = frames
            .iter()
            .map(|f| FeedMessage::from_frame(f).unwrap().unwrap())
            .collect();
        assert_eq!(
            messages,
            vec![
                FeedMessage::Update(LedgerUpdate::Accounts(vec![])),
                FeedMessage::Update(LedgerUpdate::Transfers(vec![])),
            ]
        );
    }

    #[test]
    fn unknown_types_are_skipped_and_garbage_is_an_error() {
        let frame = SseFrame {
            event: None,
            data: r#"{"type":"presence","data":1}"#.into(),
        };
        assert_eq!(FeedMessage::from_frame(&frame).unwrap(), None);

        let garbage = SseFrame {
            event: None,
            data: "not json".into(),
        };
        assert!(FeedMessage::from_frame(&garbage).is_err());
    }
}
