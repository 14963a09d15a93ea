//! Terminal rendering of chat turns and API responses.

use chrono::{DateTime, Utc};
use hydronet_client::format::relative_time;
use hydronet_client::{
    ConversationSummary, HealthStatus, McpService, QuotaInfo, QuotaLevel, ReferralInfo,
    SystemInfo, ToolInvocation, TurnUpdate,
};
use hydronet_core::{display_name, ToolStatus};

const BAR_WIDTH: usize = 20;

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text to print for one turn update, if any.
pub fn turn_update(update: &TurnUpdate) -> Option<String> {
    match update {
        TurnUpdate::Text { delta } => Some(delta.clone()),
        TurnUpdate::ToolStarted(card) => {
            let mut out = format!("\n[{}] {}\n", card.status_label(), card.display_name);
            if card.arguments != "{}" {
                out.push_str(&indent(&card.arguments));
                out.push('\n');
            }
            Some(out)
        }
        TurnUpdate::ToolFinished(update) => {
            let mut out = format!(
                "[{}] {}\n",
                update.status_label(),
                display_name(&update.tool_name)
            );
            let body = update.body.as_text();
            if !body.is_empty() {
                out.push_str(&indent(body));
                out.push('\n');
            }
            Some(out)
        }
        TurnUpdate::Completed => Some("\n".to_string()),
        TurnUpdate::Ignored => None,
    }
}

/// One line per stored invocation, used when showing a conversation.
pub fn invocation(invocation: &ToolInvocation) -> String {
    let mut out = format!(
        "  [{}] {}",
        invocation.status.label(),
        invocation.display_name()
    );
    match invocation.status {
        ToolStatus::Failed => {
            if let Some(error) = &invocation.error {
                out.push_str(&format!(": {error}"));
            }
        }
        ToolStatus::Completed | ToolStatus::Running => {}
    }
    out
}

pub fn conversation(summary: &ConversationSummary, now: DateTime<Utc>) -> String {
    let when = summary
        .updated_at
        .as_deref()
        .or(summary.created_at.as_deref())
        .and_then(|ts| relative_time(ts, now))
        .unwrap_or_default();
    format!(
        "{}  {}  ({} 条消息)  {}",
        summary.id, summary.title, summary.message_count, when
    )
    .trim_end()
    .to_string()
}

pub fn quota(quota: &QuotaInfo) -> String {
    let filled = if quota.is_unlimited() {
        0
    } else {
        ((quota.usage_percent() / 100.0) * BAR_WIDTH as f64)
            .round()
            .min(BAR_WIDTH as f64) as usize
    };
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
    let level = match quota.level() {
        QuotaLevel::Normal => "",
        QuotaLevel::Warning => " !",
        QuotaLevel::Critical => " !!",
    };
    format!(
        "{}: {}/{} [{}]{}",
        quota.tier,
        quota.used,
        quota.limit_label(),
        bar,
        level
    )
}

pub fn referral(info: &ReferralInfo) -> String {
    format!(
        "邀请码: {}\n已邀请: {}  已转化: {}",
        info.referral_code, info.stats.total, info.stats.converted
    )
}

/// System information followed by the health report.
pub fn status(info: &SystemInfo, health: &HealthStatus) -> String {
    let mut lines = vec![format!("{} {}", info.name, info.version)];
    if let Some(edition) = &info.edition {
        lines.push(format!("版本类型: {edition}"));
    }
    if let Some(description) = &info.description {
        lines.push(description.clone());
    }
    if !info.features.is_empty() {
        lines.push(format!("功能: {}", info.features.join(", ")));
    }
    if let Some(stats) = &info.statistics {
        lines.push(format!(
            "用户: {}  对话: {}  消息: {}  MCP服务: {}",
            stats.users, stats.conversations, stats.messages, stats.mcp_services
        ));
    }

    let state = if health.is_healthy() { "✅" } else { "⚠️" };
    lines.push(format!("状态: {state} {}", health.status));
    if let Some(model) = &health.ai_model {
        let available = if model.available { "可用" } else { "不可用" };
        lines.push(format!("模型: {} ({}) {available}", model.model, model.provider));
    }
    lines.join("\n")
}

pub fn service(service: &McpService) -> String {
    let state = if service.is_active() {
        "✅ 已激活"
    } else {
        "⏸️ 待配置"
    };
    let mut out = format!("[{state}] {} ({})", service.label(), service.kind);
    if !service.methods.is_empty() {
        out.push_str(&format!("\n    方法: {}", service.methods.join(", ")));
    }
    if let Some(url) = &service.url {
        out.push_str(&format!("\n    URL: {url}"));
    }
    out
}
