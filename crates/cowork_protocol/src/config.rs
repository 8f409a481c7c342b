use std::time::Duration;

use crate::url::DEFAULT_AGENT_BASE_URL;

/// Transport configuration for one agent backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// HTTP(S) or WS(S) base URL of the agent server.
    pub base_url: String,
    /// Per-process identifier placed in the WebSocket path.
    pub client_id: String,
    /// Upper bound for opening the persistent channel.
    pub connect_timeout: Option<Duration>,
    /// Upper bound for each REST request.
    pub request_timeout: Option<Duration>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AGENT_BASE_URL.to_string(),
            client_id: "cowork".to_string(),
            connect_timeout: None,
            request_timeout: None,
        }
    }
}

impl ProtocolConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Returns the WebSocket endpoint for this client.
    pub fn websocket_url(&self) -> String {
        crate::url::websocket_url(&self.base_url, &self.client_id)
    }
}
