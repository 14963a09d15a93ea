//! HTTP-level tests for `HydroNetClient` against a mock backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hydronet_client::{
    ClientConfig, CorrelationPolicy, HydroNetClient, HydroNetError, QuotaLevel, ToolStatus,
    TurnUpdate,
};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HydroNetClient {
    let config = ClientConfig {
        base_url: server.uri(),
        user_id: "operator-1".into(),
        ..ClientConfig::default()
    };
    HydroNetClient::new(config).unwrap()
}

fn sse(lines: &[&str]) -> String {
    lines.iter().map(|l| format!("data: {l}\n\n")).collect()
}

#[tokio::test]
async fn chat_turn_streams_text_and_tools() {
    let server = MockServer::start().await;
    let body = sse(&[
        r#"{"type":"text","content":"正在分析"}"#,
        r#"{"type":"tool_call","tool_name":"prediction","status":"running","arguments":{"horizon":24}}"#,
        r#"{"type":"tool_result","tool_name":"prediction","status":"completed","result":{"peak":3.2}}"#,
        r#"{"type":"text","content":"，预计峰值3.2米"}"#,
        r#"{"type":"complete","conversation_id":"conv-42"}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .and(header("X-User-ID", "operator-1"))
        .and(body_json(json!({"conversation_id": null, "message": "明天水位如何"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut updates = Vec::new();
    let summary = client
        .send_message(None, "  明天水位如何  ", |u| updates.push(u.clone()))
        .await
        .unwrap();

    assert_eq!(summary.text, "正在分析，预计峰值3.2米");
    assert_eq!(summary.conversation_id.as_deref(), Some("conv-42"));
    assert!(summary.completed);
    assert_eq!(summary.invocations.len(), 1);
    assert_eq!(summary.invocations[0].status, ToolStatus::Completed);
    assert_eq!(summary.invocations[0].display_name(), "prediction");
    assert!(matches!(updates[1], TurnUpdate::ToolStarted(_)));
    assert!(matches!(updates[2], TurnUpdate::ToolFinished(_)));
}

#[tokio::test]
async fn chat_turn_surfaces_stream_error() {
    let server = MockServer::start().await;
    let body = sse(&[
        r#"{"type":"text","content":"partial"}"#,
        r#"{"type":"error","error":"model unavailable"}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_message(Some("conv-1"), "hi", |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.server_message(), Some("model unavailable"));
}

#[tokio::test]
async fn quota_exceeded_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "quota_exceeded",
            "message": "您已用完本月100次免费额度"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_message(None, "hi", |_| {})
        .await
        .unwrap_err();
    match err {
        HydroNetError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "您已用完本月100次免费额度");
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_message_is_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_message(None, "   ", |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, HydroNetError::InvalidInput(_)));
}

#[tokio::test]
async fn list_and_show_conversations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .and(header("X-User-ID", "operator-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [
                {"id": "c1", "title": "水库调度", "message_count": 4,
                 "created_at": "2026-10-01T08:00:00", "updated_at": "2026-10-01T09:00:00"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation": {"id": "c1", "title": "水库调度"},
            "messages": [
                {"role": "user", "content": "调度方案"},
                {"role": "assistant", "content": "已生成", "tool_calls": [
                    {"type": "tool_call", "tool_name": "scheduling", "arguments": {}},
                    {"type": "tool_result", "tool_name": "scheduling", "result": {"plan": "B"}}
                ]}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let list = client.list_conversations().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "水库调度");
    assert_eq!(list[0].message_count, 4);

    let detail = client.get_conversation("c1").await.unwrap();
    assert_eq!(detail.messages.len(), 2);
    let history = detail.messages[1]
        .tool_history(CorrelationPolicy::Fifo)
        .unwrap();
    assert_eq!(history.invocations().len(), 1);
    assert_eq!(history.invocations()[0].status, ToolStatus::Completed);
    assert!(detail.messages[0]
        .tool_history(CorrelationPolicy::Fifo)
        .unwrap()
        .invocations()
        .is_empty());
}

#[tokio::test]
async fn delete_conversation_and_missing_one() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "对话不存在"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete_conversation("c1").await.unwrap();
    let err = client.delete_conversation("gone").await.unwrap_err();
    assert!(matches!(err, HydroNetError::Api { status: 404, ref message } if message == "对话不存在"));
}

#[tokio::test]
async fn quota_and_referral() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/quota"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quota": {"tier": "free", "used": 90, "limit": 100, "remaining": 10, "can_use": true}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/referral"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "referral_code": "HN-7F3A",
            "stats": {"total": 3, "converted": 1}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let quota = client.quota().await.unwrap();
    assert_eq!(quota.level(), QuotaLevel::Critical);
    assert_eq!(quota.remaining, 10);

    let referral = client.referral().await.unwrap();
    assert_eq!(referral.referral_code, "HN-7F3A");
    assert_eq!(referral.stats.converted, 1);
}

#[tokio::test]
async fn slow_response_headers_count_against_turn_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse(&[r#"{"type":"complete"}"#]), "text/event-stream")
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        base_url: server.uri(),
        turn_timeout_secs: 1,
        ..ClientConfig::default()
    };
    let client = HydroNetClient::new(config).unwrap();

    let started = Instant::now();
    let err = client.send_message(None, "hi", |_| {}).await.unwrap_err();
    assert!(matches!(err, HydroNetError::Timeout(d) if d == Duration::from_secs(1)));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn conversation_id_cannot_escape_its_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/quota"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation": {"id": "x", "title": "wrong endpoint"}
        })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/user/quota"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/..%2Fuser%2Fquota"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "对话不存在"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_conversation("../user/quota").await.unwrap_err();
    assert!(matches!(err, HydroNetError::Api { status: 404, .. }));

    let err = client.delete_conversation("..").await.unwrap_err();
    assert!(matches!(err, HydroNetError::InvalidInput(_)));
}

#[tokio::test]
async fn non_streaming_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("X-User-ID", "operator-1"))
        .and(body_json(json!({"conversation_id": "c1", "message": "当前水位"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "当前水位2.4米",
            "conversation_id": "c1",
            "mcp_data": {"level": 2.4},
            "timestamp": "2026-10-16T08:00:00"
        })))
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .chat(Some("c1"), "当前水位")
        .await
        .unwrap();
    assert_eq!(reply.message, "当前水位2.4米");
    assert_eq!(reply.conversation_id.as_deref(), Some("c1"));
    assert_eq!(reply.mcp_data, Some(json!({"level": 2.4})));
}

#[tokio::test]
async fn non_streaming_chat_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "模型暂不可用"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).chat(None, "hi").await.unwrap_err();
    assert_eq!(err.server_message(), Some("模型暂不可用"));
}

#[tokio::test]
async fn health_system_info_and_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .and(header("X-User-ID", "operator-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "timestamp": "2026-10-16T08:00:00",
            "version": "pro",
            "ai_model": {"provider": "阿里云", "model": "qwen-plus", "available": true},
            "mcp_services": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/system/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "HydroNet Pro",
            "version": "3.0.0",
            "edition": "Professional",
            "features": ["流式响应", "配额管理"],
            "statistics": {"users": 3, "conversations": 12, "messages": 80, "mcp_services": 2}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/mcp/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "services": [
                {"name": "simulation", "description": "水网仿真服务", "type": "remote",
                 "methods": ["run", "status"], "status": "active",
                 "url": "http://sim.local"},
                {"name": "testing", "type": "mock", "methods": [], "status": "pending"}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.mcp_services, Some(2));

    let info = client.system_info().await.unwrap();
    assert_eq!(info.name, "HydroNet Pro");
    assert_eq!(info.features.len(), 2);
    assert_eq!(info.statistics.unwrap().conversations, 12);

    let services = client.services().await.unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].label(), "水网仿真服务");
    assert!(services[0].is_active());
    assert_eq!(services[1].label(), "testing");
    assert!(!services[1].is_active());
}
