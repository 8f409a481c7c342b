//! Conversation driver: owns conversation state and consumes the
//! connection's ordered inbound frames.

use cowork_protocol::Frame;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::aggregator::aggregate;
use crate::artifact::ArtifactId;
use crate::composer::{compose_chat, SessionContext};
use crate::connection::{ConnectOutcome, ConnectionManager, Inbound};
use crate::conversation::{Change, Conversation};
use crate::error::{ConnectError, InboundTaken, SendError};
use crate::events::{ClientEvent, EventBus};
use crate::message::{Message, MessageId};
use crate::router::{EventRouter, RouteEffect};
use crate::session::{Session, SettingsOverrides};

pub struct CoworkClient {
    connection: ConnectionManager,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    conversation: Conversation,
    session: Session,
    context: SessionContext,
    router: EventRouter,
    events: EventBus,
}

impl CoworkClient {
    /// Attaches a conversation to `connection`, taking its inbound frames.
    pub fn new(
        connection: ConnectionManager,
        context: SessionContext,
        router: EventRouter,
    ) -> Result<Self, InboundTaken> {
        let inbound = connection.take_inbound().ok_or(InboundTaken)?;
        let events = connection.events().clone();
        let session = Session::new(connection.settings_overrides());
        Ok(Self {
            connection,
            inbound,
            conversation: Conversation::new(),
            session,
            context,
            router,
            events,
        })
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.context
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn connect(&self) -> Result<ConnectOutcome, ConnectError> {
        self.connection.connect().await
    }

    /// Composes and sends a chat message.
    ///
    /// The user message is recorded only once the frame is on the wire;
    /// rejected or failed sends leave the conversation unchanged. A
    /// successful send marks the conversation as awaiting a reply, so a
    /// transport loss before the first `thinking` frame still reports.
    pub async fn send_message(&mut self, text: &str) -> Result<MessageId, SendError> {
        let request = compose_chat(text, &self.context, &self.session)?;
        self.connection.send(&request).await?;

        let content = text.trim().to_string();
        let (id, change) = self.conversation.push_complete(Message::user(content));
        self.conversation.set_awaiting_response(true);
        self.publish(change);
        Ok(id)
    }

    /// Stores the overrides on the session and forwards them to the
    /// connection. Returns true if a `settings` frame was sent now.
    pub async fn update_settings(
        &mut self,
        overrides: SettingsOverrides,
    ) -> Result<bool, SendError> {
        self.session.overrides = overrides.clone();
        self.connection.set_settings_overrides(overrides).await
    }

    /// Applies one inbound frame. Content frames go to the aggregator,
    /// everything else to the router, in arrival order.
    pub fn handle_frame(&mut self, frame: &Frame) {
        match frame {
            Frame::Thinking { .. } | Frame::Stream { .. } | Frame::Complete { .. } => {
                let change = aggregate(&mut self.conversation, frame);
                self.publish(change);
            }
            Frame::SessionCreated { .. }
            | Frame::ToolCall { .. }
            | Frame::FileModified { .. }
            | Frame::ToolApproved { .. }
            | Frame::ApprovalRequest { .. }
            | Frame::Error { .. }
            | Frame::SettingsUpdated { .. }
            | Frame::Unknown { .. } => {
                let effect = self
                    .router
                    .route(frame, &mut self.conversation, &mut self.session);
                self.publish_effect(effect);
            }
        }
    }

    pub fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Frame(frame) => self.handle_frame(&frame),
            Inbound::Closed { error } => {
                debug!(error = ?error, "channel closed");
                let change = self.conversation.interrupt(error.as_ref());
                self.publish(change);
            }
        }
    }

    /// Waits for the next inbound item without applying it.
    pub async fn next_inbound(&mut self) -> Option<Inbound> {
        self.inbound.recv().await
    }

    /// Waits for and applies the next inbound item. Returns false once the
    /// connection manager is gone.
    pub async fn pump_one(&mut self) -> bool {
        match self.inbound.recv().await {
            Some(inbound) => {
                self.handle_inbound(inbound);
                true
            }
            None => false,
        }
    }

    /// Applies everything already queued. Returns the number of items.
    pub fn pump_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(inbound) = self.inbound.try_recv() {
            self.handle_inbound(inbound);
            handled += 1;
        }
        handled
    }

    /// Resets messages, artifacts and the session id. The backend is not told.
    pub fn clear_conversation(&mut self) {
        self.conversation = Conversation::new();
        self.session.reset();
        self.publish(Change {
            messages: true,
            artifacts: true,
        });
    }

    /// Clears local state and continues a stored session.
    pub fn resume_session(&mut self, session_id: &str) {
        self.clear_conversation();
        self.session = Session::resumed(session_id, self.session.overrides.clone());
    }

    pub fn dismiss_artifact(&mut self, id: ArtifactId) -> bool {
        let dismissed = self.conversation.dismiss_artifact(id);
        if dismissed {
            self.events.publish(ClientEvent::ArtifactsChanged);
        }
        dismissed
    }

    fn publish(&self, change: Change) {
        if change.messages {
            self.events.publish(ClientEvent::MessagesChanged);
        }
        if change.artifacts {
            self.events.publish(ClientEvent::ArtifactsChanged);
        }
    }

    fn publish_effect(&self, effect: RouteEffect) {
        match effect {
            RouteEffect::Conversation(change) => self.publish(change),
            RouteEffect::SessionConflict {
                current,
                offered,
                change,
            } => {
                self.publish(change);
                self.events
                    .publish(ClientEvent::SessionConflict { current, offered });
            }
            RouteEffect::SettingsAcknowledged { status } => self
                .events
                .publish(ClientEvent::SettingsAcknowledged { status }),
            RouteEffect::ApprovalForwarded { tool } => self
                .events
                .publish(ClientEvent::ApprovalRequested { tool }),
            RouteEffect::Ignored
            | RouteEffect::SessionAssigned
            | RouteEffect::FileRefreshQueued
            | RouteEffect::ToolApproved => {}
        }
    }
}

impl std::fmt::Debug for CoworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoworkClient")
            .field("connection", &self.connection)
            .field("session", &self.session)
            .field("messages", &self.conversation.messages().len())
            .field("artifacts", &self.conversation.artifacts().len())
            .finish()
    }
}
