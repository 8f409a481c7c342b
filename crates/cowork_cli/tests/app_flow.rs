use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cowork_bridge::{BridgeResult, FileStatus, VersionControlBridge};
use cowork_cli::app::{App, Flow};
use cowork_client::{ConnectionManager, CoworkClient, EventRouter, Role, SessionContext};
use cowork_mock::MockBackend;
use cowork_protocol::{AgentRestClient, BackoffPolicy, ProtocolConfig};

const PUMP_TIMEOUT: Duration = Duration::from_secs(2);

struct StubGit;

impl VersionControlBridge for StubGit {
    fn status(&self, _repo_path: &Path) -> BridgeResult<Vec<FileStatus>> {
        Ok(vec![FileStatus {
            path: "src/lib.rs".to_string(),
            code: " M".to_string(),
        }])
    }

    fn current_branch(&self, _repo_path: &Path) -> BridgeResult<String> {
        Ok("main".to_string())
    }
}

fn app_for(backend: &MockBackend, work_dir: &Path) -> App {
    // Nothing listens on the discard port, so REST calls fail fast.
    let config = ProtocolConfig::new("cli-test")
        .with_base_url("http://127.0.0.1:9")
        .with_request_timeout(Duration::from_millis(500));
    let connection = ConnectionManager::new(&config, Arc::new(backend.clone()));
    let client = CoworkClient::new(connection, SessionContext::new(work_dir), EventRouter::new())
        .expect("fresh manager");
    let rest = AgentRestClient::new(&config).expect("rest client");
    App::new(client, rest, Box::new(StubGit)).with_backoff(BackoffPolicy::no_retry())
}

async fn line(app: &mut App, input: &str) -> String {
    let mut out = Vec::new();
    let flow = app.handle_line(input, &mut out).await.expect("write to vec");
    assert_eq!(flow, Flow::Continue);
    String::from_utf8(out).expect("utf8")
}

async fn pump_response(app: &mut App, out: &mut Vec<u8>) {
    loop {
        let conversation = app.client().conversation();
        let done = !conversation.is_awaiting_response()
            && conversation.streaming_message().is_none()
            && conversation
                .messages()
                .last()
                .is_some_and(|message| message.role != Role::User);
        if done {
            return;
        }
        let inbound = tokio::time::timeout(PUMP_TIMEOUT, app.client_mut().next_inbound())
            .await
            .expect("inbound within timeout")
            .expect("manager alive");
        app.handle_inbound(inbound, out).expect("write to vec");
    }
}

#[tokio::test]
async fn chat_line_renders_the_streamed_reply_and_its_artifact() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));
    let mut out = Vec::new();
    app.connect(&mut out).await.expect("write");

    let sent = line(&mut app, "build a page").await;
    assert_eq!(sent, "you> build a page\n");
    pump_response(&mut app, &mut out).await;

    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with("connected to ws://127.0.0.1:9/ws/cli-test"), "{text}");
    assert!(text.contains("tool> write_file {\"path\":\"hello.html\"}\n"), "{text}");
    assert!(text.contains("agent> Here is a small page"), "{text}");
    assert!(text.contains("  + artifact 1: html (Hello page)\n"), "{text}");

    assert!(line(&mut app, "/artifacts").await.contains("1. html (Hello page)"));
    assert!(line(&mut app, "/show 1")
        .await
        .contains("<h1>Hello from the mock agent</h1>"));
    assert_eq!(line(&mut app, "/dismiss 1").await, "dismissed artifact 1\n");
    assert_eq!(line(&mut app, "/show 1").await, "no artifact 1\n");
}

#[tokio::test]
async fn commands_work_before_connecting() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));

    assert_eq!(
        line(&mut app, "/model kimi-k2").await,
        "settings saved; sent on next connect\n"
    );
    assert_eq!(line(&mut app, "hello").await, "not connected (use /connect)\n");
    assert_eq!(line(&mut app, "/auto on").await, "auto-accept on\n");
    assert!(app.client().context().auto_accept);
    assert_eq!(line(&mut app, "/bogus").await, "unknown command /bogus; try /help\n");
    assert_eq!(line(&mut app, "/show").await, "usage: /show <n>\n");
    assert!(backend.sent_requests().is_empty());

    let mut out = Vec::new();
    let flow = app.handle_line("/quit", &mut out).await.expect("write");
    assert_eq!(flow, Flow::Quit);
}

#[tokio::test]
async fn model_override_is_sent_once_connected() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));
    line(&mut app, "/model kimi-k2").await;
    line(&mut app, "/connect").await;

    let sent = backend.sent_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request_type(), "settings");
    assert_eq!(line(&mut app, "/key sk-live").await, "settings sent\n");
}

#[tokio::test]
async fn file_selection_resolves_against_the_work_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("notes.md"), "# notes").expect("write file");
    let backend = MockBackend::default();
    let mut app = app_for(&backend, dir.path());

    let output = line(&mut app, "/file notes.md").await;
    assert!(output.starts_with("selected "), "{output}");
    let selected = app
        .client()
        .context()
        .selected_file
        .clone()
        .expect("selection");
    assert_eq!(selected.name, "notes.md");
    assert!(!selected.is_directory);

    assert!(line(&mut app, "/file missing.txt")
        .await
        .starts_with("no such file: "));
    assert!(app.client().context().selected_file.is_some());

    assert_eq!(line(&mut app, "/file").await, "file context cleared\n");
    assert!(app.client().context().selected_file.is_none());
}

#[tokio::test]
async fn status_reports_local_state_when_the_server_is_unreachable() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));

    let output = line(&mut app, "/status").await;
    assert!(output.starts_with("connection: disconnected (ws://127.0.0.1:9/ws/cli-test)\n"), "{output}");
    assert!(output.contains("session: none\n"), "{output}");
    assert!(output.contains("server: unreachable"), "{output}");
}

#[tokio::test]
async fn session_commands_report_rest_failures() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));

    assert!(line(&mut app, "/sessions").await.starts_with("sessions unavailable: "));
    assert!(line(&mut app, "/resume abc").await.starts_with("cannot resume abc: "));
    assert!(line(&mut app, "/forget abc").await.starts_with("cannot delete abc: "));
    assert_eq!(app.client().session().session_id(), None);
}

#[tokio::test]
async fn git_command_prints_branch_and_changes() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));

    assert_eq!(line(&mut app, "/git").await, "branch: main\n M src/lib.rs\n");
}

#[tokio::test]
async fn transport_loss_is_reported_with_a_reconnect_hint() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));
    line(&mut app, "/connect").await;

    backend.drop_connection("restart");
    let inbound = tokio::time::timeout(PUMP_TIMEOUT, app.client_mut().next_inbound())
        .await
        .expect("inbound within timeout")
        .expect("manager alive");
    let mut out = Vec::new();
    app.handle_inbound(inbound, &mut out).expect("write");

    assert_eq!(
        String::from_utf8(out).expect("utf8"),
        "disconnected: channel closed by peer (code 1011): restart (use /connect)\n"
    );
}

#[tokio::test]
async fn clear_resets_the_conversation() {
    let backend = MockBackend::default();
    let mut app = app_for(&backend, Path::new("/work"));
    line(&mut app, "/connect").await;
    line(&mut app, "hi").await;
    let mut out = Vec::new();
    pump_response(&mut app, &mut out).await;

    assert_eq!(line(&mut app, "/clear").await, "conversation cleared\n");
    assert!(app.client().conversation().messages().is_empty());
    assert_eq!(app.client().session().session_id(), None);
}
