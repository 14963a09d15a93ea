use crate::config::CorrelationPolicy;
use crate::stream::EventStream;
use crate::tracker::{ToolCallTracker, ToolCard, ToolInvocation, ToolUpdate};
use futures_util::StreamExt;
use hydronet_core::{HydroNetError, HydroNetResult, StreamEvent};
use std::time::Duration;
use tracing::info;

/// What changed after applying one event, for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnUpdate {
    /// More assistant text arrived.
    Text { delta: String },
    /// A tool card should be shown.
    ToolStarted(ToolCard),
    /// A shown tool card reached a terminal state.
    ToolFinished(ToolUpdate),
    /// The backend finished the turn.
    Completed,
    /// The event had no visible effect (e.g. an unmatched tool result).
    Ignored,
}

/// Outcome of a chat turn that ended without error.
#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub conversation_id: Option<String>,
    pub text: String,
    pub invocations: Vec<ToolInvocation>,
    /// False when the stream ended without a `complete` event.
    pub completed: bool,
}

/// State of one chat turn: the conversation it belongs to, the assistant
/// text so far, and the tool invocations seen.
///
/// A turn is created when the user sends a message and consumed by
/// [`drive`](Self::drive) or [`into_summary`](Self::into_summary).
#[derive(Debug)]
pub struct ChatTurn {
    conversation_id: Option<String>,
    text: String,
    tracker: ToolCallTracker,
    completed: bool,
}

impl ChatTurn {
    pub fn new(conversation_id: Option<String>, policy: CorrelationPolicy) -> Self {
        Self {
            conversation_id,
            text: String::new(),
            tracker: ToolCallTracker::new(policy),
            completed: false,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tracker(&self) -> &ToolCallTracker {
        &self.tracker
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Applies one event. An `Error` event fails the turn.
    pub fn apply(&mut self, event: StreamEvent) -> HydroNetResult<TurnUpdate> {
        let update = match event {
            StreamEvent::Text { content } => {
                self.text.push_str(&content);
                TurnUpdate::Text { delta: content }
            }
            StreamEvent::ToolCall {
                tool_name,
                arguments,
            } => TurnUpdate::ToolStarted(self.tracker.on_tool_call(tool_name, arguments)),
            StreamEvent::ToolResult { tool_name, outcome } => {
                match self.tracker.on_tool_result(&tool_name, outcome) {
                    Some(update) => TurnUpdate::ToolFinished(update),
                    None => TurnUpdate::Ignored,
                }
            }
            StreamEvent::Complete { conversation_id } => {
                if conversation_id.is_some() {
                    self.conversation_id = conversation_id;
                }
                self.completed = true;
                TurnUpdate::Completed
            }
            StreamEvent::Error { message } => return Err(HydroNetError::Server(message)),
        };
        Ok(update)
    }

    /// Reads `events` to the end, reporting every update to `on_update`.
    ///
    /// With a `timeout`, the whole turn fails with
    /// [`HydroNetError::Timeout`] if it has not ended in time; the event
    /// stream is dropped either way.
    pub async fn drive<F>(
        mut self,
        mut events: EventStream,
        timeout: Option<Duration>,
        mut on_update: F,
    ) -> HydroNetResult<TurnSummary>
    where
        F: FnMut(&TurnUpdate),
    {
        let run = async {
            while let Some(item) = events.next().await {
                let update = self.apply(item?)?;
                on_update(&update);
            }
            Ok::<(), HydroNetError>(())
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| HydroNetError::Timeout(limit))??,
            None => run.await?,
        }

        info!(
            conversation_id = self.conversation_id.as_deref().unwrap_or("-"),
            tools = self.tracker.invocations().len(),
            completed = self.completed,
            "Chat turn finished"
        );
        Ok(self.into_summary())
    }

    pub fn into_summary(self) -> TurnSummary {
        TurnSummary {
            conversation_id: self.conversation_id,
            text: self.text,
            invocations: self.tracker.into_invocations(),
            completed: self.completed,
        }
    }
}
