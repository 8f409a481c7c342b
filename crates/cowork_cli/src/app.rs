//! Line-oriented front end: applies user input and inbound frames to one
//! [`CoworkClient`] and writes the results to a terminal.

use std::io::{self, Write};
use std::path::Path;

use cowork_bridge::VersionControlBridge;
use cowork_client::{
    connect_with_backoff, ConnectOutcome, CoworkClient, FileSelection, Inbound, SendError,
};
use cowork_protocol::{AgentRestClient, BackoffPolicy};
use tracing::debug;

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::render::{self, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    client: CoworkClient,
    rest: AgentRestClient,
    git: Box<dyn VersionControlBridge>,
    renderer: Renderer,
    backoff: BackoffPolicy,
}

impl App {
    pub fn new(
        client: CoworkClient,
        rest: AgentRestClient,
        git: Box<dyn VersionControlBridge>,
    ) -> Self {
        Self {
            client,
            rest,
            git,
            renderer: Renderer::new(),
            backoff: BackoffPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn client(&self) -> &CoworkClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut CoworkClient {
        &mut self.client
    }

    pub async fn connect(&mut self, out: &mut impl Write) -> io::Result<()> {
        match connect_with_backoff(self.client.connection(), self.backoff).await {
            Ok(ConnectOutcome::Opened) => writeln!(out, "connected to {}", self.client.connection().url()),
            Ok(ConnectOutcome::AlreadyConnected) => writeln!(out, "already connected"),
            Ok(ConnectOutcome::AlreadyConnecting) => writeln!(out, "connection in progress"),
            Err(error) => writeln!(out, "connect failed: {error}"),
        }
    }

    pub fn handle_inbound(&mut self, inbound: Inbound, out: &mut impl Write) -> io::Result<()> {
        let lost = match &inbound {
            Inbound::Closed { error: Some(error) } => Some(error.to_string()),
            _ => None,
        };
        self.client.handle_inbound(inbound);
        self.render(out)?;
        if let Some(error) = lost {
            writeln!(out, "disconnected: {error} (use /connect)")?;
        }
        Ok(())
    }

    pub fn render(&mut self, out: &mut impl Write) -> io::Result<()> {
        let conversation = self.client.conversation();
        self.renderer.render_messages(conversation, out)?;
        self.renderer.render_new_artifacts(conversation, out)
    }

    pub async fn handle_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        let Some(command) = parse_slash_command(line) else {
            self.send(line, out).await?;
            return Ok(Flow::Continue);
        };
        debug!(?command, "slash command");

        match command {
            SlashCommand::Help => writeln!(out, "{HELP_TEXT}")?,
            SlashCommand::Quit => return Ok(Flow::Quit),
            SlashCommand::Clear => {
                self.client.clear_conversation();
                self.renderer.reset();
                writeln!(out, "conversation cleared")?;
            }
            SlashCommand::Model(model) => {
                let overrides = self.client.session().overrides.clone().with_model(model);
                self.apply_settings(overrides, out).await?;
            }
            SlashCommand::Key(api_key) => {
                let overrides = self.client.session().overrides.clone().with_api_key(api_key);
                self.apply_settings(overrides, out).await?;
            }
            SlashCommand::AutoAccept(enabled) => {
                self.client.context_mut().auto_accept = enabled;
                let state = if enabled { "on" } else { "off" };
                writeln!(out, "auto-accept {state}")?;
            }
            SlashCommand::File(path) => self.select_file(path.as_deref(), out)?,
            SlashCommand::Artifacts => {
                render::write_artifact_list(self.client.conversation().artifacts(), out)?;
            }
            SlashCommand::Show(index) => match self.client.conversation().artifacts().get(index - 1) {
                Some(artifact) => {
                    writeln!(out, "--- {} ---", render::artifact_label(artifact))?;
                    writeln!(out, "{}", artifact.content)?;
                }
                None => writeln!(out, "no artifact {index}")?,
            },
            SlashCommand::Dismiss(index) => {
                let id = self
                    .client
                    .conversation()
                    .artifacts()
                    .get(index - 1)
                    .map(|artifact| artifact.id);
                match id {
                    Some(id) if self.client.dismiss_artifact(id) => {
                        self.renderer.render_new_artifacts(self.client.conversation(), out)?;
                        writeln!(out, "dismissed artifact {index}")?;
                    }
                    _ => writeln!(out, "no artifact {index}")?,
                }
            }
            SlashCommand::Sessions => match self.rest.list_sessions().await {
                Ok(sessions) => render::write_session_list(&sessions, out)?,
                Err(error) => writeln!(out, "sessions unavailable: {error}")?,
            },
            SlashCommand::Resume(session_id) => match self.rest.session(&session_id).await {
                Ok(record) => {
                    self.client.resume_session(&record.session_id);
                    self.renderer.reset();
                    render::write_transcript(&record, out)?;
                }
                Err(error) => writeln!(out, "cannot resume {session_id}: {error}")?,
            },
            SlashCommand::Forget(session_id) => match self.rest.delete_session(&session_id).await {
                Ok(()) => writeln!(out, "deleted {session_id}")?,
                Err(error) => writeln!(out, "cannot delete {session_id}: {error}")?,
            },
            SlashCommand::Status => self.status(out).await?,
            SlashCommand::Git => self.git_status(out)?,
            SlashCommand::Connect => self.connect(out).await?,
            SlashCommand::Usage(usage) => writeln!(out, "usage: {usage}")?,
            SlashCommand::Unknown(command) => {
                writeln!(out, "unknown command {command}; try /help")?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn send(&mut self, line: &str, out: &mut impl Write) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        match self.client.send_message(line).await {
            Ok(_) => self.render(out),
            Err(SendError::NotConnected) => writeln!(out, "not connected (use /connect)"),
            Err(error) => writeln!(out, "send failed: {error}"),
        }
    }

    async fn apply_settings(
        &mut self,
        overrides: cowork_client::SettingsOverrides,
        out: &mut impl Write,
    ) -> io::Result<()> {
        match self.client.update_settings(overrides).await {
            Ok(true) => writeln!(out, "settings sent"),
            Ok(false) => writeln!(out, "settings saved; sent on next connect"),
            Err(error) => writeln!(out, "settings failed: {error}"),
        }
    }

    fn select_file(&mut self, path: Option<&str>, out: &mut impl Write) -> io::Result<()> {
        let Some(path) = path else {
            self.client.context_mut().selected_file = None;
            return writeln!(out, "file context cleared");
        };

        let resolved = self.client.context().work_dir.join(Path::new(path));
        match FileSelection::from_existing(&resolved) {
            Some(selection) => {
                writeln!(out, "selected {}", selection.path.display())?;
                self.client.context_mut().selected_file = Some(selection);
                Ok(())
            }
            None => writeln!(out, "no such file: {}", resolved.display()),
        }
    }

    async fn status(&mut self, out: &mut impl Write) -> io::Result<()> {
        let health = self.client.connection().health();
        writeln!(out, "connection: {} ({})", health.state, self.client.connection().url())?;
        if let Some(error) = &health.last_error {
            writeln!(out, "last error: {error}")?;
        }
        match self.client.session().session_id() {
            Some(session_id) => writeln!(out, "session: {session_id}")?,
            None => writeln!(out, "session: none")?,
        }

        match self.rest.health().await {
            Ok(status) if status.is_healthy() => writeln!(out, "server: healthy")?,
            Ok(status) => writeln!(out, "server: {}", status.status)?,
            Err(error) => {
                writeln!(out, "server: unreachable ({error})")?;
                return Ok(());
            }
        }
        match self.rest.settings().await {
            Ok(settings) => writeln!(
                out,
                "model: {} (api key {})",
                settings.model,
                if settings.api_key.is_some() { "set" } else { "unset" }
            ),
            Err(error) => writeln!(out, "settings unavailable: {error}"),
        }
    }

    fn git_status(&self, out: &mut impl Write) -> io::Result<()> {
        let repo = &self.client.context().work_dir;
        match self.git.current_branch(repo) {
            Ok(branch) => writeln!(out, "branch: {branch}")?,
            Err(error) => return writeln!(out, "git unavailable: {error}"),
        }
        match self.git.status(repo) {
            Ok(files) if files.is_empty() => writeln!(out, "working tree clean"),
            Ok(files) => {
                for file in files {
                    writeln!(out, "{} {}", file.code, file.path)?;
                }
                Ok(())
            }
            Err(error) => writeln!(out, "git status failed: {error}"),
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("client", &self.client)
            .field("rest", &self.rest.base_url())
            .finish()
    }
}
