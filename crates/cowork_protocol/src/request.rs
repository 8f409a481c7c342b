use serde::{Deserialize, Serialize};

/// Outbound request sent to the agent backend, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Chat(ChatRequest),
    /// Model/API-key overrides; the server reads them from a nested
    /// `settings` object.
    Settings { settings: SettingsPayload },
}

impl Request {
    /// Wire tags accepted by the inverse decoder.
    pub const KNOWN_TYPES: [&'static str; 2] = ["chat", "settings"];

    pub fn request_type(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Settings { .. } => "settings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub work_dir: String,
    /// `null` until the backend has assigned one.
    pub session_id: Option<String>,
    #[serde(default)]
    pub auto_accept: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_file: Option<SelectedFile>,
}

/// File-context selection. Carries identity only, never file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub path: String,
    pub name: String,
    #[serde(rename = "isDirectory", default)]
    pub is_directory: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl SettingsPayload {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.api_key.is_none()
    }
}
