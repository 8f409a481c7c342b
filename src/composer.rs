//! Builds outbound requests from user input and session context.

use std::path::{Path, PathBuf};

use cowork_protocol::{ChatRequest, Request, SelectedFile, SettingsPayload};

use crate::error::ComposeError;
use crate::session::{Session, SettingsOverrides};

/// The user's active file-context selection. Identity only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub path: PathBuf,
    pub name: String,
    pub is_directory: bool,
}

impl FileSelection {
    pub fn new(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            is_directory,
        }
    }

    /// Selection for an existing path, or `None` if it cannot be stat'ed.
    pub fn from_existing(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(Self::new(path, metadata.is_dir()))
    }
}

/// Client-side context merged into every chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub work_dir: PathBuf,
    pub auto_accept: bool,
    pub selected_file: Option<FileSelection>,
}

impl SessionContext {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            auto_accept: false,
            selected_file: None,
        }
    }

    pub fn with_auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    pub fn with_selected_file(mut self, selected_file: Option<FileSelection>) -> Self {
        self.selected_file = selected_file;
        self
    }
}

/// Composes one `chat` request.
///
/// Rejects text that is empty after trimming; such a message never reaches
/// the transport.
pub fn compose_chat(
    message: &str,
    context: &SessionContext,
    session: &Session,
) -> Result<Request, ComposeError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ComposeError::EmptyMessage);
    }

    Ok(Request::Chat(ChatRequest {
        message: message.to_string(),
        work_dir: context.work_dir.display().to_string(),
        session_id: session.session_id().map(ToString::to_string),
        auto_accept: context.auto_accept,
        selected_file: context
            .selected_file
            .as_ref()
            .map(|selection| SelectedFile {
                path: selection.path.display().to_string(),
                name: selection.name.clone(),
                is_directory: selection.is_directory,
            }),
    }))
}

/// Composes a `settings` request from the non-blank overrides.
///
/// Returns `None` when nothing would be sent: an empty string would tell the
/// backend to drop its default.
pub fn compose_settings(overrides: &SettingsOverrides) -> Option<Request> {
    let settings = SettingsPayload {
        model: overrides.effective_model().map(ToString::to_string),
        api_key: overrides.effective_api_key().map(ToString::to_string),
    };
    if settings.is_empty() {
        return None;
    }
    Some(Request::Settings { settings })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext::new("/work")
    }

    #[test]
    fn chat_trims_message_and_carries_context() {
        let mut session = Session::default();
        session.assign("s1");
        let context = context()
            .with_auto_accept(true)
            .with_selected_file(Some(FileSelection::new("/work/src/main.rs", false)));

        let request = compose_chat("  fix the bug \n", &context, &session).expect("compose");
        let Request::Chat(chat) = request else {
            panic!("expected chat request");
        };
        assert_eq!(chat.message, "fix the bug");
        assert_eq!(chat.work_dir, "/work");
        assert_eq!(chat.session_id.as_deref(), Some("s1"));
        assert!(chat.auto_accept);
        let selected = chat.selected_file.expect("selection");
        assert_eq!(selected.name, "main.rs");
        assert!(!selected.is_directory);
    }

    #[test]
    fn chat_without_assigned_session_sends_null_id() {
        let request = compose_chat("hi", &context(), &Session::default()).expect("compose");
        let Request::Chat(chat) = request else {
            panic!("expected chat request");
        };
        assert_eq!(chat.session_id, None);
        assert_eq!(chat.selected_file, None);
    }

    #[test]
    fn whitespace_only_message_is_rejected() {
        let error = compose_chat(" \t\n", &context(), &Session::default()).expect_err("empty");
        assert!(matches!(error, ComposeError::EmptyMessage));
        assert!(compose_chat("", &context(), &Session::default()).is_err());
    }

    #[test]
    fn settings_carries_only_non_blank_fields() {
        let overrides = SettingsOverrides::default()
            .with_model(" kimi-k2 ")
            .with_api_key("  ");
        let Some(Request::Settings { settings }) = compose_settings(&overrides) else {
            panic!("expected settings request");
        };
        assert_eq!(settings.model.as_deref(), Some("kimi-k2"));
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn settings_with_nothing_to_send_is_not_composed() {
        assert_eq!(compose_settings(&SettingsOverrides::default()), None);
        let blank = SettingsOverrides::default().with_model("").with_api_key(" ");
        assert_eq!(compose_settings(&blank), None);
    }
}
