//! Subscription point for rendering and editor layers.

use tokio::sync::broadcast;

use crate::connection::ConnectionState;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    MessagesChanged,
    ArtifactsChanged,
    ConnectionStateChanged(ConnectionState),
    /// Backend acknowledged a `settings` frame.
    SettingsAcknowledged { status: Option<String> },
    ApprovalRequested { tool: Option<String> },
    /// Backend started `offered` instead of continuing `current`.
    SessionConflict { current: String, offered: String },
}

/// Broadcast fan-out. Slow subscribers lag and lose events; publishing
/// never waits on them.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}
