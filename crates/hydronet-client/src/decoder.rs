//! Incremental decoder for the chat stream's `data: <json>` lines.
//!
//! Bytes go in with [`SseDecoder::push`] in whatever chunks the transport
//! delivers; complete events come out one at a time from
//! [`SseDecoder::next_event`]. Nothing is parsed until a full line is
//! buffered, so a line split across reads is only seen once it is whole.

use hydronet_core::{HydroNetResult, StreamEvent, ToolOutcome};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

const DATA_PREFIX: &str = "data: ";

/// Stateful UTF-8 decoder.
///
/// An incomplete multi-byte sequence at the end of a chunk is held back and
/// completed by the next chunk. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    fn finish(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(char::REPLACEMENT_CHARACTER)
    }
}

/// Line-framed event decoder for one chat stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    utf8: Utf8Decoder,
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of raw bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);
    }

    /// Marks the end of input.
    ///
    /// A trailing line without a newline is completed so that
    /// [`next_event`](Self::next_event) still sees it.
    pub fn finish(&mut self) {
        if let Some(replacement) = self.utf8.finish() {
            self.buffer.push(replacement);
        }
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
    }

    /// Returns the next event from the complete lines buffered so far.
    ///
    /// `Ok(None)` means more input is needed. A `data:` line whose payload
    /// is not valid JSON is an error; the offending line is consumed.
    pub fn next_event(&mut self) -> HydroNetResult<Option<StreamEvent>> {
        while let Some(pos) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=pos).collect();
            let line = raw.trim_end_matches('\n').trim_end_matches('\r');

            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                if !line.is_empty() {
                    trace!(line, "Skipping non-data line");
                }
                continue;
            };

            let wire: WireEvent = serde_json::from_str(payload)?;
            if let Some(event) = wire.into_event() {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    /// Number of bytes of text waiting for a line terminator.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Decodes an already-parsed wire object, e.g. one entry of a stored
/// conversation's tool-call history.
pub fn event_from_value(value: Value) -> HydroNetResult<Option<StreamEvent>> {
    let wire: WireEvent = serde_json::from_value(value)?;
    Ok(wire.into_event())
}

/// The JSON object carried by a `data:` line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Text {
        #[serde(default)]
        content: Option<String>,
    },
    ToolCall {
        tool_name: String,
        #[serde(default)]
        arguments: Option<Map<String, Value>>,
    },
    ToolResult {
        tool_name: String,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    Complete {
        #[serde(default)]
        conversation_id: Option<String>,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl WireEvent {
    fn into_event(self) -> Option<StreamEvent> {
        let event = match self {
            Self::Text { content } => StreamEvent::Text {
                content: content.unwrap_or_default(),
            },
            Self::ToolCall {
                tool_name,
                arguments,
            } => StreamEvent::ToolCall {
                tool_name,
                arguments: arguments.unwrap_or_default(),
            },
            Self::ToolResult {
                tool_name,
                status,
                result,
                error,
            } => {
                let outcome = match (result, error) {
                    (Some(value), _) => ToolOutcome::Result(value),
                    (None, Some(message)) => ToolOutcome::Error(message),
                    (None, None) if status.as_deref() == Some("failed") => {
                        ToolOutcome::Error(String::new())
                    }
                    (None, None) => ToolOutcome::Result(Value::Null),
                };
                StreamEvent::ToolResult { tool_name, outcome }
            }
            Self::Complete { conversation_id } => StreamEvent::Complete { conversation_id },
            Self::Error { error, message } => StreamEvent::Error {
                message: error
                    .or(message)
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
            Self::Unknown => {
                debug!("Skipping event with unrecognized type");
                return None;
            }
        };
        Some(event)
    }
}
