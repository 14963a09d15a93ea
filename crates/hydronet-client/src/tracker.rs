use crate::config::CorrelationPolicy;
use crate::decoder::event_from_value;
use crate::format::{escape_html, pretty_json};
use hydronet_core::{display_name, HydroNetResult, StreamEvent, ToolOutcome, ToolStatus};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Handle identifying one invocation within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InvocationId(pub usize);

/// Lifecycle record of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub id: InvocationId,
    pub tool_name: String,
    pub status: ToolStatus,
    pub arguments: Map<String, Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl ToolInvocation {
    pub fn display_name(&self) -> &str {
        display_name(&self.tool_name)
    }
}

/// Everything needed to render a freshly started invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCard {
    pub id: InvocationId,
    pub tool_name: String,
    pub display_name: String,
    pub status: ToolStatus,
    /// Arguments pretty-printed as JSON.
    pub arguments: String,
}

impl ToolCard {
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }
}

/// Formatted outcome of a finished invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultBody {
    /// A string result, unescaped.
    Text(String),
    /// A structured result, pretty-printed.
    Json(String),
    /// The tool's error message, unescaped.
    Error(String),
}

impl ResultBody {
    fn from_outcome(outcome: &ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Result(Value::String(text)) => Self::Text(text.clone()),
            ToolOutcome::Result(value) => Self::Json(pretty_json(value)),
            ToolOutcome::Error(message) => Self::Error(message.clone()),
        }
    }

    /// Plain text for terminals.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Json(text) | Self::Error(text) => text,
        }
    }

    /// HTML fragment to splice into the invocation's card.
    pub fn to_html(&self) -> String {
        match self {
            Self::Text(text) => escape_html(text),
            Self::Json(json) => format!("<pre>{}</pre>", escape_html(json)),
            Self::Error(message) => format!("❌ {}", escape_html(message)),
        }
    }
}

/// Update for an invocation that reached a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUpdate {
    pub id: InvocationId,
    pub tool_name: String,
    pub status: ToolStatus,
    pub body: ResultBody,
}

impl ToolUpdate {
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }
}

/// Correlates `tool_result` events with earlier `tool_call` events of one
/// chat turn.
///
/// Invocations are matched on the raw tool name. When several invocations of
/// the same tool are running, the [`CorrelationPolicy`] picks one. A result
/// without a running match is dropped; invocations are never removed.
#[derive(Debug, Default)]
pub struct ToolCallTracker {
    policy: CorrelationPolicy,
    invocations: Vec<ToolInvocation>,
}

impl ToolCallTracker {
    pub fn new(policy: CorrelationPolicy) -> Self {
        Self {
            policy,
            invocations: Vec::new(),
        }
    }

    /// Records a new running invocation and returns its card.
    pub fn on_tool_call(
        &mut self,
        tool_name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> ToolCard {
        let tool_name = tool_name.into();
        let id = InvocationId(self.invocations.len());
        debug!(tool = %tool_name, id = id.0, "Tool invocation started");

        let card = ToolCard {
            id,
            display_name: display_name(&tool_name).to_string(),
            arguments: pretty_json(&Value::Object(arguments.clone())),
            tool_name: tool_name.clone(),
            status: ToolStatus::Running,
        };

        self.invocations.push(ToolInvocation {
            id,
            tool_name,
            status: ToolStatus::Running,
            arguments,
            result: None,
            error: None,
        });
        card
    }

    /// Resolves a running invocation of `tool_name`.
    ///
    /// Returns `None` when no invocation of that tool is running.
    pub fn on_tool_result(&mut self, tool_name: &str, outcome: ToolOutcome) -> Option<ToolUpdate> {
        let Some(index) = self.find_running(tool_name) else {
            warn!(tool = %tool_name, "Dropping tool result without a running invocation");
            return None;
        };

        let body = ResultBody::from_outcome(&outcome);
        let invocation = &mut self.invocations[index];
        match outcome {
            ToolOutcome::Result(value) => {
                invocation.status = ToolStatus::Completed;
                invocation.result = Some(value);
            }
            ToolOutcome::Error(message) => {
                invocation.status = ToolStatus::Failed;
                invocation.error = Some(message);
            }
        }
        debug!(
            tool = %tool_name,
            id = invocation.id.0,
            status = %invocation.status,
            "Tool invocation finished"
        );

        Some(ToolUpdate {
            id: invocation.id,
            tool_name: invocation.tool_name.clone(),
            status: invocation.status,
            body,
        })
    }

    fn find_running(&self, tool_name: &str) -> Option<usize> {
        let mut running = self
            .invocations
            .iter()
            .enumerate()
            .filter(|(_, inv)| inv.status == ToolStatus::Running && inv.tool_name == tool_name)
            .map(|(index, _)| index);
        match self.policy {
            CorrelationPolicy::Fifo => running.next(),
            CorrelationPolicy::Lifo => running.last(),
        }
    }

    /// All invocations seen so far, in creation order.
    pub fn invocations(&self) -> &[ToolInvocation] {
        &self.invocations
    }

    pub fn get(&self, id: InvocationId) -> Option<&ToolInvocation> {
        self.invocations.get(id.0)
    }

    pub fn running_count(&self) -> usize {
        self.invocations
            .iter()
            .filter(|inv| inv.status == ToolStatus::Running)
            .count()
    }

    pub fn into_invocations(self) -> Vec<ToolInvocation> {
        self.invocations
    }

    /// Rebuilds the tool history persisted with a stored assistant message.
    ///
    /// `entries` is the stored `tool_calls` column: a JSON array of
    /// `tool_call` / `tool_result` objects, or a string holding one. Entries
    /// of any other type are skipped.
    pub fn replay(entries: &Value, policy: CorrelationPolicy) -> HydroNetResult<Self> {
        let mut tracker = Self::new(policy);

        let parsed;
        let entries = match entries {
            Value::String(raw) if raw.trim().is_empty() => return Ok(tracker),
            Value::String(raw) => {
                parsed = serde_json::from_str::<Value>(raw)?;
                &parsed
            }
            other => other,
        };

        let Some(items) = entries.as_array() else {
            return Ok(tracker);
        };

        for item in items {
            match event_from_value(item.clone())? {
                Some(StreamEvent::ToolCall {
                    tool_name,
                    arguments,
                }) => {
                    tracker.on_tool_call(tool_name, arguments);
                }
                Some(StreamEvent::ToolResult { tool_name, outcome }) => {
                    tracker.on_tool_result(&tool_name, outcome);
                }
                _ => {}
            }
        }
        Ok(tracker)
    }
}
