//! HTTP client for the HydroNet backend.
//!
//! Chat turns go through a [`ChatTransport`]; the conversation, quota,
//! referral, health and service endpoints are plain JSON requests. Every request carries the
//! configured user id in the `X-User-ID` header.

use crate::config::{ClientConfig, CorrelationPolicy};
use crate::tracker::ToolCallTracker;
use crate::transport::sse::USER_HEADER;
use crate::transport::{api_error, ChatRequest, ChatTransport, SseTransport};
use crate::turn::{ChatTurn, TurnSummary, TurnUpdate};
use hydronet_core::{HydroNetError, HydroNetResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info};

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Tool history of an assistant message, as stored by the backend.
    #[serde(default)]
    pub tool_calls: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl StoredMessage {
    /// Rebuilds the tool invocations recorded with this message.
    pub fn tool_history(&self, policy: CorrelationPolicy) -> HydroNetResult<ToolCallTracker> {
        match &self.tool_calls {
            Some(entries) => ToolCallTracker::replay(entries, policy),
            None => Ok(ToolCallTracker::new(policy)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub conversation: ConversationRecord,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Quota usage reported by the backend. A `limit` of `-1` means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub used: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub remaining: i64,
    #[serde(default)]
    pub can_use: bool,
}

/// Coarse usage band, used to colour the quota bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaLevel {
    Normal,
    Warning,
    Critical,
}

impl QuotaInfo {
    pub fn is_unlimited(&self) -> bool {
        self.limit == -1
    }

    /// Used share of the limit in percent; 0 for unlimited tiers.
    pub fn usage_percent(&self) -> f64 {
        if self.is_unlimited() || self.limit <= 0 {
            return 0.0;
        }
        self.used as f64 / self.limit as f64 * 100.0
    }

    pub fn limit_label(&self) -> String {
        if self.is_unlimited() {
            "∞".to_string()
        } else {
            self.limit.to_string()
        }
    }

    pub fn level(&self) -> QuotaLevel {
        let percent = self.usage_percent();
        if percent > 80.0 {
            QuotaLevel::Critical
        } else if percent > 50.0 {
            QuotaLevel::Warning
        } else {
            QuotaLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferralStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub converted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralInfo {
    pub referral_code: String,
    #[serde(default)]
    pub stats: ReferralStats,
}

/// Service health as reported by `GET /api/health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ai_model: Option<AiModelStatus>,
    /// Number of registered MCP services.
    #[serde(default)]
    pub mcp_services: Option<u64>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiModelStatus {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub statistics: Option<SystemStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatistics {
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub conversations: u64,
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub mcp_services: u64,
}

/// One entry of `GET /api/mcp/services`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpService {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl McpService {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    /// Description when present, else the service name.
    pub fn label(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Response of the non-streaming `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Raw data returned by the MCP services consulted for this answer.
    #[serde(default)]
    pub mcp_data: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct ConversationsEnvelope {
    #[serde(default)]
    conversations: Vec<ConversationSummary>,
}

#[derive(Deserialize)]
struct QuotaEnvelope {
    quota: QuotaInfo,
}

#[derive(Deserialize)]
struct ServicesEnvelope {
    #[serde(default)]
    services: Vec<McpService>,
}

const CONVERSATIONS_PATH: &str = "/api/conversations";
const CHAT_PATH: &str = "/api/chat";

/// Client for one user of the HydroNet backend.
pub struct HydroNetClient {
    config: ClientConfig,
    http: reqwest::Client,
    transport: Box<dyn ChatTransport>,
}

impl HydroNetClient {
    /// Builds a client that streams chat turns over SSE.
    pub fn new(config: ClientConfig) -> HydroNetResult<Self> {
        config.validate()?;
        let http = reqwest::Client::new();
        let transport = Box::new(SseTransport::with_client(&config, http.clone()));
        Ok(Self {
            config,
            http,
            transport,
        })
    }

    /// Builds a client around a custom chat transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Box<dyn ChatTransport>,
    ) -> HydroNetResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            http: reqwest::Client::new(),
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends one user message and runs the resulting chat turn to its end.
    ///
    /// `on_update` sees every change as it arrives. The configured timeout
    /// covers the whole turn, from sending the request to the last event.
    pub async fn send_message<F>(
        &self,
        conversation_id: Option<&str>,
        message: &str,
        on_update: F,
    ) -> HydroNetResult<TurnSummary>
    where
        F: FnMut(&TurnUpdate),
    {
        let request = chat_request(conversation_id, message)?;

        self.bounded(async {
            let events = self.transport.open_stream(&request).await?;
            ChatTurn::new(request.conversation_id.clone(), self.config.correlation)
                .drive(events, None, on_update)
                .await
        })
        .await
    }

    /// Sends one user message through the non-streaming endpoint.
    pub async fn chat(
        &self,
        conversation_id: Option<&str>,
        message: &str,
    ) -> HydroNetResult<ChatReply> {
        let request = chat_request(conversation_id, message)?;
        let url = self.config.endpoint(CHAT_PATH);
        info!(
            conversation_id = request.conversation_id.as_deref().unwrap_or("-"),
            "Sending chat message"
        );

        let reply: ChatReply = self
            .bounded(async {
                let resp = self
                    .http
                    .post(&url)
                    .header(USER_HEADER, &self.config.user_id)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| HydroNetError::Http(e.to_string()))?;
                read_json(resp).await
            })
            .await?;

        if !reply.success {
            return Err(HydroNetError::Server(
                reply
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(reply)
    }

    pub async fn list_conversations(&self) -> HydroNetResult<Vec<ConversationSummary>> {
        let envelope: ConversationsEnvelope =
            self.get_json(self.api_url(CONVERSATIONS_PATH)?).await?;
        Ok(envelope.conversations)
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> HydroNetResult<ConversationDetail> {
        let url = self.conversation_url(conversation_id)?;
        self.get_json(url).await
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> HydroNetResult<()> {
        let url = self.conversation_url(conversation_id)?;
        info!(conversation_id, "Deleting conversation");

        let resp = self
            .http
            .delete(url)
            .header(USER_HEADER, &self.config.user_id)
            .send()
            .await
            .map_err(|e| HydroNetError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(())
    }

    pub async fn quota(&self) -> HydroNetResult<QuotaInfo> {
        let envelope: QuotaEnvelope = self.get_json(self.api_url("/api/user/quota")?).await?;
        Ok(envelope.quota)
    }

    pub async fn referral(&self) -> HydroNetResult<ReferralInfo> {
        self.get_json(self.api_url("/api/user/referral")?).await
    }

    pub async fn health(&self) -> HydroNetResult<HealthStatus> {
        self.get_json(self.api_url("/api/health")?).await
    }

    pub async fn system_info(&self) -> HydroNetResult<SystemInfo> {
        self.get_json(self.api_url("/api/system/info")?).await
    }

    /// Lists the MCP services the backend can call as tools.
    pub async fn services(&self) -> HydroNetResult<Vec<McpService>> {
        let envelope: ServicesEnvelope =
            self.get_json(self.api_url("/api/mcp/services")?).await?;
        Ok(envelope.services)
    }

    /// URL of one conversation. The id is a single, percent-encoded path
    /// segment.
    fn conversation_url(&self, conversation_id: &str) -> HydroNetResult<reqwest::Url> {
        if matches!(conversation_id.trim(), "" | "." | "..") {
            return Err(HydroNetError::InvalidInput(format!(
                "invalid conversation id '{conversation_id}'"
            )));
        }

        let mut url = self.api_url(CONVERSATIONS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| HydroNetError::Config("base_url cannot carry a path".into()))?
            .push(conversation_id);
        Ok(url)
    }

    /// Runs `fut` under the configured turn timeout, if any.
    async fn bounded<T, F>(&self, fut: F) -> HydroNetResult<T>
    where
        F: Future<Output = HydroNetResult<T>>,
    {
        match self.config.turn_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| HydroNetError::Timeout(limit))?,
            None => fut.await,
        }
    }

    fn api_url(&self, path: &str) -> HydroNetResult<reqwest::Url> {
        reqwest::Url::parse(&self.config.endpoint(path))
            .map_err(|e| HydroNetError::Config(format!("invalid base_url: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> HydroNetResult<T> {
        debug!(%url, "GET");

        let resp = self
            .http
            .get(url)
            .header(USER_HEADER, &self.config.user_id)
            .send()
            .await
            .map_err(|e| HydroNetError::Http(e.to_string()))?;
        read_json(resp).await
    }
}

fn chat_request(conversation_id: Option<&str>, message: &str) -> HydroNetResult<ChatRequest> {
    let message = message.trim();
    if message.is_empty() {
        return Err(HydroNetError::InvalidInput("message is empty".into()));
    }
    Ok(ChatRequest {
        conversation_id: conversation_id.map(str::to_string),
        message: message.to_string(),
    })
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> HydroNetResult<T> {
    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }
    let body = resp
        .bytes()
        .await
        .map_err(|e| HydroNetError::Http(e.to_string()))?;
    Ok(serde_json::from_slice(&body)?)
}
