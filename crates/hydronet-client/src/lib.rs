//! Streaming chat client for the HydroNet assistant service.
//!
//! A chat turn flows through three stages:
//!
//! - [`decoder`] / [`stream`] turn the raw response body into a lazy
//!   sequence of [`StreamEvent`]s.
//! - [`tracker`] follows the lifecycle of the tool invocations announced by
//!   those events.
//! - [`turn`] applies the events to one [`ChatTurn`] and reports
//!   display-ready [`TurnUpdate`]s.
//!
//! [`HydroNetClient`] ties these to the backend's HTTP API.

pub mod api;
pub mod config;
pub mod decoder;
pub mod format;
pub mod stream;
pub mod tracker;
pub mod transport;
pub mod turn;

pub use api::{
    AiModelStatus, ChatReply, ConversationDetail, ConversationRecord, ConversationSummary,
    HealthStatus, HydroNetClient, McpService, QuotaInfo, QuotaLevel, ReferralInfo, ReferralStats,
    StoredMessage, SystemInfo, SystemStatistics,
};
pub use config::{ClientConfig, CorrelationPolicy};
pub use decoder::SseDecoder;
pub use hydronet_core::{HydroNetError, HydroNetResult, StreamEvent, ToolOutcome, ToolStatus};
pub use stream::{event_stream, EventStream};
pub use tracker::{InvocationId, ResultBody, ToolCallTracker, ToolCard, ToolInvocation, ToolUpdate};
pub use transport::{ChatRequest, ChatTransport, SseTransport};
pub use turn::{ChatTurn, TurnSummary, TurnUpdate};
