pub mod sse;

use crate::stream::EventStream;
use async_trait::async_trait;
use hydronet_core::{HydroNetError, HydroNetResult};
use serde::{Deserialize, Serialize};

pub use sse::SseTransport;

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// `None` asks the backend to start a new conversation.
    pub conversation_id: Option<String>,
    pub message: String,
}

/// Trait for the transports a chat turn can run over.
///
/// A transport opens one stream per request and hands back its events;
/// everything after that (tool tracking, timeouts) is transport-agnostic.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `request` and returns the response as an event stream.
    async fn open_stream(&self, request: &ChatRequest) -> HydroNetResult<EventStream>;
}

/// Converts a non-success response into [`HydroNetError::Api`].
///
/// The backend reports errors as JSON with a `message` and/or `error`
/// field; anything else falls back to a generic message.
pub(crate) async fn api_error(resp: reqwest::Response) -> HydroNetError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    HydroNetError::Api {
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v["message"]
                .as_str()
                .filter(|m| !m.is_empty())
                .or_else(|| v["error"].as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| "request failed".to_string())
}
