use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use cowork_bridge::{GitCli, LocalFileSystem};
use cowork_cli::app::{App, Flow};
use cowork_cli::approval::TerminalApprovalPrompt;
use cowork_cli::refresh::spawn_refresh_consumer;
use cowork_client::{
    ClientConfig, ConnectionManager, CoworkClient, EventRouter, Inbound, TransportKind,
};
use cowork_mock::{MockBackend, MockScript};
use cowork_protocol::{AgentRestClient, Connector, WsConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "warn,cowork_cli=info,cowork_client=info,cowork_protocol=info,cowork_bridge=info";
const MOCK_FRAME_DELAY: Duration = Duration::from_millis(40);

enum Step {
    Line(Option<String>),
    Inbound(Option<Inbound>),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env().map_err(io::Error::other)?;
    let connector: Arc<dyn Connector> = match config.transport {
        TransportKind::WebSocket => Arc::new(WsConnector::new()),
        TransportKind::Mock => Arc::new(MockBackend::new(
            MockScript::default().with_frame_delay(MOCK_FRAME_DELAY),
        )),
    };
    let protocol = config.protocol_config();
    let connection = ConnectionManager::process_wide(|| {
        ConnectionManager::new(&protocol, Arc::clone(&connector))
    });
    if let Err(error) = connection
        .set_settings_overrides(config.settings_overrides())
        .await
    {
        tracing::warn!(%error, "could not apply settings overrides");
    }

    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
    let refresh = spawn_refresh_consumer(
        Arc::new(LocalFileSystem::new()),
        config.work_dir.clone(),
        refresh_rx,
    );
    let router = EventRouter::new()
        .with_file_refresh(refresh_tx)
        .with_approval_prompt(Arc::new(TerminalApprovalPrompt::new(io::stdout())));

    let client = CoworkClient::new(connection.clone(), config.session_context(), router)
        .map_err(io::Error::other)?;
    let rest = AgentRestClient::new(&protocol).map_err(io::Error::other)?;
    let mut app = App::new(client, rest, Box::new(GitCli::new()));

    let mut stdout = io::stdout();
    app.connect(&mut stdout).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Line(line?),
            inbound = app.client_mut().next_inbound() => Step::Inbound(inbound),
        };

        match step {
            Step::Line(None) => break,
            Step::Line(Some(line)) => {
                if app.handle_line(&line, &mut stdout).await? == Flow::Quit {
                    break;
                }
            }
            Step::Inbound(Some(inbound)) => app.handle_inbound(inbound, &mut stdout)?,
            Step::Inbound(None) => break,
        }
    }

    connection.disconnect().await;
    refresh.abort();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
