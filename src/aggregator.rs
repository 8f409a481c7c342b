//! Folds `thinking` / `stream` / `complete` frames into conversation state.

use cowork_protocol::Frame;
use tracing::trace;

use crate::conversation::{Change, Conversation};
use crate::message::Message;

/// Pure reducer over the frame sequence.
pub fn fold(mut conversation: Conversation, frame: &Frame) -> Conversation {
    aggregate(&mut conversation, frame);
    conversation
}

/// In-place form of [`fold`]; returns what changed. Non-content frames are
/// ignored.
pub fn aggregate(conversation: &mut Conversation, frame: &Frame) -> Change {
    match frame {
        Frame::Thinking { .. } => {
            conversation.set_awaiting_response(true);
            Change::NONE
        }
        Frame::Stream { content, .. } => {
            match conversation.streaming_message_mut() {
                Some(open) => open.content.push_str(content),
                None => conversation.push_streaming(Message::assistant_streaming(content.as_str())),
            }
            Change::MESSAGES
        }
        Frame::Complete { tools_used, .. } => {
            conversation.set_awaiting_response(false);
            let change = conversation.finalize_streaming(tools_used.clone().unwrap_or_default());
            if change.is_empty() {
                trace!("complete without an open assistant message");
            }
            change
        }
        Frame::SessionCreated { .. }
        | Frame::ToolCall { .. }
        | Frame::FileModified { .. }
        | Frame::ToolApproved { .. }
        | Frame::ApprovalRequest { .. }
        | Frame::Error { .. }
        | Frame::SettingsUpdated { .. }
        | Frame::Unknown { .. } => Change::NONE,
    }
}
