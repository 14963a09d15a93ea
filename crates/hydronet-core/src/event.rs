use serde::Serialize;
use serde_json::{Map, Value};

/// A structured event decoded from one `data:` line of a chat stream.
///
/// Events are produced in arrival order and each one is consumed exactly
/// once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of assistant text.
    Text {
        content: String,
    },

    /// The assistant started a tool invocation.
    ToolCall {
        tool_name: String,
        arguments: Map<String, Value>,
    },

    /// A tool invocation finished, successfully or not.
    ToolResult {
        tool_name: String,
        outcome: ToolOutcome,
    },

    /// The turn finished. The backend attaches the conversation id it
    /// stored the turn under.
    Complete {
        conversation_id: Option<String>,
    },

    /// The backend reported a failure for this turn.
    Error {
        message: String,
    },
}

impl StreamEvent {
    /// Returns true for events after which no further events are read.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Result payload of a `tool_result` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool returned a value.
    Result(Value),
    /// The tool failed with a message.
    Error(String),
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
