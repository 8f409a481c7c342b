use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation reported in a `complete` frame's `tools_used` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

/// Inbound frame sent by the agent backend, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Backend minted a session identifier for this conversation.
    SessionCreated { session_id: String },
    /// Backend started producing a response.
    Thinking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Incremental assistant text.
    Stream {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    ToolCall {
        tool: String,
        #[serde(default)]
        args: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    FileModified {
        file_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// An auto-approved tool call went through.
    ToolApproved {
        #[serde(default)]
        auto: bool,
    },
    ApprovalRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Response finished.
    ///
    /// `content` is the backend's own copy of the full response; the client's
    /// aggregated stream text stays authoritative.
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tools_used: Option<Vec<ToolUse>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    Error {
        #[serde(default)]
        error: String,
    },
    /// Acknowledgment of an outbound `settings` frame.
    SettingsUpdated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    /// Frame type this client does not know about. Never produced by serde;
    /// the codec builds it for forward compatibility.
    #[serde(skip)]
    Unknown { frame_type: String },
}

impl Frame {
    /// Wire tags the codec decodes into typed variants.
    pub const KNOWN_TYPES: [&'static str; 10] = [
        "session_created",
        "thinking",
        "stream",
        "tool_call",
        "file_modified",
        "tool_approved",
        "approval_request",
        "complete",
        "error",
        "settings_updated",
    ];

    pub fn is_known_type(frame_type: &str) -> bool {
        Self::KNOWN_TYPES.contains(&frame_type)
    }

    /// Returns the wire tag of this frame.
    pub fn frame_type(&self) -> &str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::Thinking { .. } => "thinking",
            Self::Stream { .. } => "stream",
            Self::ToolCall { .. } => "tool_call",
            Self::FileModified { .. } => "file_modified",
            Self::ToolApproved { .. } => "tool_approved",
            Self::ApprovalRequest { .. } => "approval_request",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::SettingsUpdated { .. } => "settings_updated",
            Self::Unknown { frame_type } => frame_type,
        }
    }

    /// Returns true for frames that feed the streaming aggregator rather than
    /// the control-frame router.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Self::Thinking { .. } | Self::Stream { .. } | Self::Complete { .. }
        )
    }
}
