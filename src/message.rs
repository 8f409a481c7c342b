use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use cowork_protocol::ToolUse;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    Tool,
    Error,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Error => "error",
        }
    }
}

/// Tool name and opaque arguments of a `tool` message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub args: Value,
}

/// One conversation entry.
///
/// Only assistant messages are ever created incomplete; everything else is
/// complete from the start.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub is_complete: bool,
    /// Response was cut short by connection loss or teardown.
    pub interrupted: bool,
    pub tool: Option<ToolInvocation>,
    pub tools_used: Vec<ToolUse>,
    pub timestamp: OffsetDateTime,
}

impl Message {
    fn new(role: Role, content: String, is_complete: bool) -> Self {
        Self {
            id: MessageId::next(),
            role,
            content,
            is_complete,
            interrupted: false,
            tool: None,
            tools_used: Vec::new(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), true)
    }

    /// Assistant message that is still receiving stream frames.
    pub fn assistant_streaming(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into(), false)
    }

    pub fn tool(name: impl Into<String>, args: Value) -> Self {
        let name = name.into();
        let mut message = Self::new(Role::Tool, name.clone(), true);
        message.tool = Some(ToolInvocation { name, args });
        message
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Role::Error, content.into(), true)
    }

    pub fn is_streaming_assistant(&self) -> bool {
        self.role == Role::Assistant && !self.is_complete
    }

    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.format(&Rfc3339).unwrap_or_default()
    }
}
