use super::{api_error, ChatRequest, ChatTransport};
use crate::config::ClientConfig;
use crate::stream::{event_stream, EventStream};
use async_trait::async_trait;
use hydronet_core::{HydroNetError, HydroNetResult};
use tracing::info;

pub(crate) const USER_HEADER: &str = "X-User-ID";
const CHAT_STREAM_PATH: &str = "/api/chat/stream";

/// Server-Sent Events transport: `POST /api/chat/stream`.
pub struct SseTransport {
    url: String,
    user_id: String,
    http: reqwest::Client,
}

impl SseTransport {
    /// Builds the transport on an existing HTTP client (connection pool).
    pub fn with_client(config: &ClientConfig, http: reqwest::Client) -> Self {
        Self {
            url: config.endpoint(CHAT_STREAM_PATH),
            user_id: config.user_id.clone(),
            http,
        }
    }
}

#[async_trait]
impl ChatTransport for SseTransport {
    async fn open_stream(&self, request: &ChatRequest) -> HydroNetResult<EventStream> {
        info!(
            conversation_id = request.conversation_id.as_deref().unwrap_or("-"),
            "Opening chat stream"
        );

        let resp = self
            .http
            .post(&self.url)
            .header(USER_HEADER, &self.user_id)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| HydroNetError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        Ok(event_stream(resp.bytes_stream()))
    }
}
