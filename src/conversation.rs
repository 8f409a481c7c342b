use cowork_protocol::{ToolUse, TransportError};

use crate::artifact::{extract_artifacts, Artifact, ArtifactId};
use crate::message::{Message, MessageId};

/// Ordered messages, extracted artifacts, and the "awaiting response" flag.
///
/// At most one assistant message is incomplete at any time, and it is always
/// the last message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
    artifacts: Vec<Artifact>,
    awaiting_response: bool,
}

/// What a mutation touched, for change notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Change {
    pub messages: bool,
    pub artifacts: bool,
}

impl Change {
    pub const NONE: Self = Self {
        messages: false,
        artifacts: false,
    };
    pub const MESSAGES: Self = Self {
        messages: true,
        artifacts: false,
    };

    pub fn merge(self, other: Self) -> Self {
        Self {
            messages: self.messages || other.messages,
            artifacts: self.artifacts || other.artifacts,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.messages && !self.artifacts
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn artifact(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.id == id)
    }

    /// The assistant message currently receiving stream frames.
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages
            .last()
            .filter(|message| message.is_streaming_assistant())
    }

    pub(crate) fn streaming_message_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .last_mut()
            .filter(|message| message.is_streaming_assistant())
    }

    /// Appends a complete message. A streaming assistant message, if any,
    /// is finalized first so an open message is always the last one.
    pub(crate) fn push_complete(&mut self, message: Message) -> (MessageId, Change) {
        debug_assert!(message.is_complete);
        let change = self.finalize_streaming(Vec::new()).merge(Change::MESSAGES);
        let id = message.id;
        self.messages.push(message);
        (id, change)
    }

    /// Closes the streaming assistant message and lifts its artifacts.
    ///
    /// Extraction runs exactly once per message, here; the content is
    /// replaced by the cleaned text. No-op without an open message.
    pub(crate) fn finalize_streaming(&mut self, tools_used: Vec<ToolUse>) -> Change {
        let Some(open) = self.streaming_message_mut() else {
            return Change::NONE;
        };
        open.is_complete = true;
        open.tools_used = tools_used;
        let extraction = extract_artifacts(&open.content);
        open.content = extraction.cleaned_text;

        Change {
            messages: true,
            artifacts: self.push_artifacts(extraction.artifacts),
        }
    }

    pub(crate) fn push_streaming(&mut self, message: Message) {
        debug_assert!(self.streaming_message().is_none());
        self.messages.push(message);
    }

    fn push_artifacts(&mut self, artifacts: Vec<Artifact>) -> bool {
        if artifacts.is_empty() {
            return false;
        }
        self.artifacts.extend(artifacts);
        true
    }

    pub(crate) fn set_awaiting_response(&mut self, awaiting: bool) {
        self.awaiting_response = awaiting;
    }

    /// Removes one artifact. Returns false when it is not present.
    pub fn dismiss_artifact(&mut self, id: ArtifactId) -> bool {
        let before = self.artifacts.len();
        self.artifacts.retain(|artifact| artifact.id != id);
        self.artifacts.len() != before
    }

    /// Handles loss or teardown of the channel.
    ///
    /// The in-flight response is closed as interrupted without extraction.
    /// A transport error also appends an error message; a deliberate close
    /// (`None`) does not.
    pub fn interrupt(&mut self, error: Option<&TransportError>) -> Change {
        let mut change = Change::NONE;
        if let Some(open) = self.streaming_message_mut() {
            open.is_complete = true;
            open.interrupted = true;
            change = Change::MESSAGES;
        }

        let was_awaiting = std::mem::replace(&mut self.awaiting_response, false);
        if let Some(error) = error {
            if was_awaiting || change.messages {
                self.messages
                    .push(Message::error(format!("Connection lost: {error}")));
                change = Change::MESSAGES;
            }
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn interrupt_closes_stream_and_reports_transport_error() {
        let mut conversation = Conversation::new();
        conversation.set_awaiting_response(true);
        conversation.push_streaming(Message::assistant_streaming("partial"));

        let change = conversation.interrupt(Some(&TransportError::Closed {
            code: 1006,
            reason: String::new(),
        }));

        assert!(change.messages);
        assert!(!conversation.is_awaiting_response());
        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_complete && messages[0].interrupted);
        assert_eq!(messages[0].content, "partial");
        assert_eq!(messages[1].role, Role::Error);
    }

    #[test]
    fn deliberate_close_adds_no_error_message() {
        let mut conversation = Conversation::new();
        conversation.push_streaming(Message::assistant_streaming("partial"));

        conversation.interrupt(None);
        assert_eq!(conversation.messages().len(), 1);
        assert!(conversation.streaming_message().is_none());
    }

    #[test]
    fn idle_transport_loss_leaves_conversation_alone() {
        let mut conversation = Conversation::new();
        let _ = conversation.push_complete(Message::user("hi"));

        let change = conversation.interrupt(Some(&TransportError::Receive("reset".to_string())));
        assert!(change.is_empty());
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn pushing_a_complete_message_finalizes_an_open_stream() {
        let mut conversation = Conversation::new();
        conversation.push_streaming(Message::assistant_streaming(
            "see <artifact type=\"svg\"><svg/></artifact>",
        ));
        let (_, change) =
            conversation.push_complete(Message::tool("shell", serde_json::Value::Null));

        assert!(change.messages && change.artifacts);
        assert!(conversation.streaming_message().is_none());
        let first = &conversation.messages()[0];
        assert!(first.is_complete && !first.interrupted);
        assert_eq!(first.content, "see ");
        assert_eq!(conversation.artifacts().len(), 1);
    }
}
