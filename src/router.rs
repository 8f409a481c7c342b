//! Dispatches control frames to their side effects.
//!
//! Runs synchronously in frame order alongside the aggregator; nothing here
//! awaits.

use std::path::PathBuf;
use std::sync::Arc;

use cowork_bridge::{ApprovalPrompt, ApprovalRequest};
use cowork_protocol::Frame;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::conversation::{Change, Conversation};
use crate::message::Message;
use crate::session::{Assignment, Session};

/// Observable outcome of routing one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEffect {
    Ignored,
    SessionAssigned,
    /// Backend minted `offered` while the session already held `current`.
    /// A notice was appended to the conversation.
    SessionConflict {
        current: String,
        offered: String,
        change: Change,
    },
    Conversation(Change),
    FileRefreshQueued,
    ApprovalForwarded { tool: Option<String> },
    ToolApproved,
    SettingsAcknowledged { status: Option<String> },
}

#[derive(Default)]
pub struct EventRouter {
    file_refresh: Option<mpsc::UnboundedSender<PathBuf>>,
    approval: Option<Arc<dyn ApprovalPrompt>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths from `file_modified` frames are queued here for the file-system
    /// side to refresh.
    pub fn with_file_refresh(mut self, sender: mpsc::UnboundedSender<PathBuf>) -> Self {
        self.file_refresh = Some(sender);
        self
    }

    pub fn with_approval_prompt(mut self, prompt: Arc<dyn ApprovalPrompt>) -> Self {
        self.approval = Some(prompt);
        self
    }

    pub fn route(
        &self,
        frame: &Frame,
        conversation: &mut Conversation,
        session: &mut Session,
    ) -> RouteEffect {
        match frame {
            Frame::SessionCreated { session_id } => match session.assign(session_id) {
                Assignment::Stored => {
                    info!(session_id, "agent session created");
                    RouteEffect::SessionAssigned
                }
                Assignment::Unchanged => RouteEffect::Ignored,
                Assignment::Conflict { current } => {
                    let notice = format!(
                        "Agent started new session {session_id}; session {current} could not be continued. Clear the conversation to start over."
                    );
                    let (_, change) = conversation.push_complete(Message::error(notice));
                    RouteEffect::SessionConflict {
                        current,
                        offered: session_id.clone(),
                        change,
                    }
                }
            },
            Frame::ToolCall { tool, args, .. } => {
                debug!(tool, "tool call");
                let (_, change) = conversation.push_complete(Message::tool(tool, args.clone()));
                RouteEffect::Conversation(change)
            }
            Frame::FileModified { file_path, .. } => {
                let Some(sender) = &self.file_refresh else {
                    debug!(file_path, "file modified; no refresh listener");
                    return RouteEffect::Ignored;
                };
                if sender.send(PathBuf::from(file_path)).is_err() {
                    debug!(file_path, "file refresh listener is gone");
                    return RouteEffect::Ignored;
                }
                RouteEffect::FileRefreshQueued
            }
            Frame::ToolApproved { auto } => {
                if let Some(prompt) = &self.approval {
                    prompt.tool_approved(*auto);
                }
                RouteEffect::ToolApproved
            }
            Frame::ApprovalRequest {
                tool,
                args,
                message,
            } => {
                let request = ApprovalRequest {
                    tool: tool.clone(),
                    args: args.clone(),
                    message: message.clone(),
                };
                match &self.approval {
                    Some(prompt) => prompt.approval_requested(&request),
                    None => warn!(tool = ?request.tool, "approval requested with no prompt attached"),
                }
                RouteEffect::ApprovalForwarded { tool: request.tool }
            }
            Frame::Error { error } => {
                warn!(error, "agent reported an error");
                let (_, change) = conversation.push_complete(Message::error(error.as_str()));
                conversation.set_awaiting_response(false);
                RouteEffect::Conversation(change)
            }
            Frame::SettingsUpdated { status } => {
                info!(status = status.as_deref().unwrap_or("ok"), "agent settings updated");
                RouteEffect::SettingsAcknowledged {
                    status: status.clone(),
                }
            }
            Frame::Unknown { frame_type } => {
                debug!(frame_type, "ignoring unknown frame type");
                RouteEffect::Ignored
            }
            Frame::Thinking { .. } | Frame::Stream { .. } | Frame::Complete { .. } => {
                RouteEffect::Ignored
            }
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("file_refresh", &self.file_refresh.is_some())
            .field("approval", &self.approval.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::Role;

    #[test]
    fn session_created_assigns_once() {
        let router = EventRouter::new();
        let mut conversation = Conversation::new();
        let mut session = Session::default();

        let frame = Frame::SessionCreated {
            session_id: "s1".to_string(),
        };
        assert_eq!(
            router.route(&frame, &mut conversation, &mut session),
            RouteEffect::SessionAssigned
        );
        assert_eq!(
            router.route(&frame, &mut conversation, &mut session),
            RouteEffect::Ignored
        );
        assert!(conversation.messages().is_empty());
    }

    #[test]
    fn different_session_id_keeps_the_first_and_tells_the_user() {
        let router = EventRouter::new();
        let mut conversation = Conversation::new();
        let mut session = Session::resumed("stored-1", Default::default());

        let effect = router.route(
            &Frame::SessionCreated {
                session_id: "fresh-2".to_string(),
            },
            &mut conversation,
            &mut session,
        );

        assert_eq!(
            effect,
            RouteEffect::SessionConflict {
                current: "stored-1".to_string(),
                offered: "fresh-2".to_string(),
                change: Change::MESSAGES,
            }
        );
        assert_eq!(session.session_id(), Some("stored-1"));
        let notice = &conversation.messages()[0];
        assert_eq!(notice.role, Role::Error);
        assert!(notice.content.contains("fresh-2"));
        assert!(notice.content.contains("stored-1"));
    }

    #[test]
    fn tool_call_appends_tool_message_with_structured_args() {
        let router = EventRouter::new();
        let mut conversation = Conversation::new();
        let mut session = Session::default();

        router.route(
            &Frame::ToolCall {
                tool: "read_file".to_string(),
                args: json!({"path": "a.txt"}),
                session_id: None,
            },
            &mut conversation,
            &mut session,
        );

        let message = &conversation.messages()[0];
        assert_eq!(message.role, Role::Tool);
        let tool = message.tool.as_ref().expect("tool invocation");
        assert_eq!(tool.args["path"], "a.txt");
    }

    #[test]
    fn error_appends_message_and_clears_awaiting() {
        let router = EventRouter::new();
        let mut conversation =
            crate::aggregator::fold(Conversation::new(), &Frame::Thinking { message: None });
        let mut session = Session::default();

        router.route(
            &Frame::Error {
                error: "rate limited".to_string(),
            },
            &mut conversation,
            &mut session,
        );

        assert!(!conversation.is_awaiting_response());
        assert_eq!(conversation.messages()[0].role, Role::Error);
        assert_eq!(conversation.messages()[0].content, "rate limited");
    }

    #[test]
    fn file_modified_is_queued_without_blocking() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let router = EventRouter::new().with_file_refresh(sender);

        let effect = router.route(
            &Frame::FileModified {
                file_path: "/work/a.txt".to_string(),
                tool: None,
                session_id: None,
            },
            &mut Conversation::new(),
            &mut Session::default(),
        );

        assert_eq!(effect, RouteEffect::FileRefreshQueued);
        assert_eq!(
            receiver.try_recv().expect("queued path"),
            PathBuf::from("/work/a.txt")
        );
    }

    #[test]
    fn file_modified_with_dropped_listener_is_ignored() {
        let (sender, receiver) = mpsc::unbounded_channel();
        drop(receiver);
        let router = EventRouter::new().with_file_refresh(sender);

        let effect = router.route(
            &Frame::FileModified {
                file_path: "a.txt".to_string(),
                tool: None,
                session_id: None,
            },
            &mut Conversation::new(),
            &mut Session::default(),
        );
        assert_eq!(effect, RouteEffect::Ignored);
    }
}
