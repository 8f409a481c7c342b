//! Incremental plain-text rendering of the conversation to a line terminal.

use std::io::{self, Write};

use cowork_client::{Artifact, Conversation, Message, MessageId, Role};
use cowork_protocol::rest::{SessionRecord, SessionSummary};

/// Tracks what has already been written so each change prints only the
/// new part of the message list.
#[derive(Debug, Default)]
pub struct Renderer {
    rendered: usize,
    streamed: Option<(MessageId, usize)>,
    artifacts_seen: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets progress; the next render starts from an empty list.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn render_messages(
        &mut self,
        conversation: &Conversation,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let messages = conversation.messages();
        if messages.len() < self.rendered {
            self.reset();
        }

        for message in &messages[self.rendered..] {
            if !message.is_complete {
                let offset = match self.streamed {
                    Some((id, offset)) if id == message.id => offset,
                    _ => {
                        write!(out, "{} ", role_label(message.role))?;
                        0
                    }
                };
                write!(out, "{}", message.content.get(offset..).unwrap_or_default())?;
                self.streamed = Some((message.id, message.content.len()));
                break;
            }

            match self.streamed.take() {
                // Already printed raw while streaming; only close the line.
                Some((id, _)) if id == message.id => {
                    if message.interrupted {
                        write!(out, " [interrupted]")?;
                    }
                    writeln!(out)?;
                }
                _ => writeln!(out, "{}", format_message(message))?,
            }
            self.rendered += 1;
        }
        out.flush()
    }

    /// Announces artifacts added since the last call.
    pub fn render_new_artifacts(
        &mut self,
        conversation: &Conversation,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let artifacts = conversation.artifacts();
        if artifacts.len() < self.artifacts_seen {
            self.artifacts_seen = artifacts.len();
        }
        for (index, artifact) in artifacts.iter().enumerate().skip(self.artifacts_seen) {
            writeln!(out, "  + artifact {}: {}", index + 1, artifact_label(artifact))?;
        }
        self.artifacts_seen = artifacts.len();
        out.flush()
    }
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you>",
        Role::Assistant => "agent>",
        Role::Tool => "tool>",
        Role::Error => "error>",
    }
}

pub fn format_message(message: &Message) -> String {
    let label = role_label(message.role);
    match (&message.tool, message.role) {
        (Some(tool), Role::Tool) => format!("{label} {} {}", tool.name, tool.args),
        _ if message.interrupted => format!("{label} {} [interrupted]", message.content),
        _ => format!("{label} {}", message.content),
    }
}

pub fn artifact_label(artifact: &Artifact) -> String {
    match &artifact.title {
        Some(title) => format!("{} ({title})", artifact.kind),
        None => artifact.kind.to_string(),
    }
}

pub fn write_artifact_list(artifacts: &[Artifact], out: &mut impl Write) -> io::Result<()> {
    if artifacts.is_empty() {
        return writeln!(out, "no artifacts");
    }
    for (index, artifact) in artifacts.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {} [{} bytes]",
            index + 1,
            artifact_label(artifact),
            artifact.content.len()
        )?;
    }
    Ok(())
}

pub fn write_session_list(sessions: &[SessionSummary], out: &mut impl Write) -> io::Result<()> {
    if sessions.is_empty() {
        return writeln!(out, "no stored sessions");
    }
    for session in sessions {
        writeln!(
            out,
            "{}  {} messages  {}  {}",
            session.session_id, session.message_count, session.created_at, session.work_dir
        )?;
    }
    Ok(())
}

/// Prints a stored transcript before a resumed session continues.
pub fn write_transcript(record: &SessionRecord, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "resumed {} ({} stored messages)",
        record.session_id,
        record.messages.len()
    )?;
    for message in &record.messages {
        let label = match message.role.as_str() {
            "user" => role_label(Role::User),
            "assistant" => role_label(Role::Assistant),
            _ => "note>",
        };
        writeln!(out, "{label} {}", message.content)?;
    }
    Ok(())
}
