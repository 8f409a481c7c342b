use cowork_protocol::{AgentRestClient, ProtocolConfig, RestError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> AgentRestClient {
    let config = ProtocolConfig::new("test").with_base_url(server.uri());
    AgentRestClient::new(&config).expect("rest client")
}

#[tokio::test]
async fn health_reports_healthy_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;

    let health = client_for(&server).await.health().await.expect("health");
    assert!(health.is_healthy());
}

#[tokio::test]
async fn list_sessions_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [
                {"session_id": "s2", "work_dir": "/b", "created_at": "2025-01-02T00:00:00", "message_count": 4},
                {"session_id": "s1", "work_dir": "/a", "created_at": "2025-01-01T00:00:00", "message_count": 0}
            ]
        })))
        .mount(&server)
        .await;

    let sessions = client_for(&server)
        .await
        .list_sessions()
        .await
        .expect("sessions");
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, "s2");
    assert_eq!(sessions[0].message_count, 4);
}

#[tokio::test]
async fn session_decodes_stored_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s1",
            "work_dir": "/a",
            "created_at": "2025-01-01T00:00:00",
            "messages": [
                {"role": "user", "content": "hi", "timestamp": "2025-01-01T00:00:01", "tools_used": []},
                {"role": "assistant", "content": "hello", "tools_used": [{"tool": "read_file", "args": {"path": "x"}}]}
            ]
        })))
        .mount(&server)
        .await;

    let record = client_for(&server)
        .await
        .session("s1")
        .await
        .expect("session");
    assert_eq!(record.messages.len(), 2);
    assert_eq!(record.messages[1].tools_used[0].tool, "read_file");
    assert_eq!(record.messages[1].timestamp, None);
}

#[tokio::test]
async fn embedded_not_found_body_is_an_error_despite_ok_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/missing"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"error": "Session not found"}, 404])),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/sessions/missing"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"error": "Session not found"}, 404])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let error = client.session("missing").await.expect_err("missing session");
    match error {
        RestError::NotFound { what, message } => {
            assert_eq!(what, "session");
            assert_eq!(message, "Session not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(matches!(
        client.delete_session("missing").await,
        Err(RestError::NotFound { .. })
    ));
}

#[tokio::test]
async fn delete_session_accepts_status_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/sessions/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .await
        .delete_session("s1")
        .await
        .expect("delete");
}

#[tokio::test]
async fn server_errors_surface_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .await
        .settings()
        .await
        .expect_err("server error");
    match error {
        RestError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal failure");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn settings_reads_masked_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"model": "kimi-k2", "api_key": "***"})),
        )
        .mount(&server)
        .await;

    let settings = client_for(&server).await.settings().await.expect("settings");
    assert_eq!(settings.model, "kimi-k2");
    assert_eq!(settings.api_key.as_deref(), Some("***"));
}
