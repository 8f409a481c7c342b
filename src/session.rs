use tracing::{debug, warn};

/// Model/API-key overrides forwarded to the backend.
///
/// Stored as typed by the user; blank values are dropped when the outbound
/// `settings` frame is composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl SettingsOverrides {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Model override after trimming, if any.
    pub fn effective_model(&self) -> Option<&str> {
        non_blank(self.model.as_deref())
    }

    pub fn effective_api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    pub fn is_effectively_empty(&self) -> bool {
        self.effective_model().is_none() && self.effective_api_key().is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Outcome of [`Session::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Stored,
    Unchanged,
    /// The session already holds `current`; the offered id was not stored.
    Conflict { current: String },
}

/// Backend-tracked conversation identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    session_id: Option<String>,
    pub overrides: SettingsOverrides,
}

impl Session {
    pub fn new(overrides: SettingsOverrides) -> Self {
        Self {
            session_id: None,
            overrides,
        }
    }

    /// Session whose identifier is already known, e.g. a stored session
    /// being resumed.
    pub fn resumed(session_id: impl Into<String>, overrides: SettingsOverrides) -> Self {
        Self {
            session_id: Some(session_id.into()),
            overrides,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Records the backend-assigned identifier.
    ///
    /// The first assignment wins. A later, different identifier is not
    /// stored; the caller gets it back as [`Assignment::Conflict`] so it can
    /// tell the user the backend did not continue this session.
    pub fn assign(&mut self, session_id: &str) -> Assignment {
        match self.session_id.as_deref() {
            None => {
                debug!(session_id, "session assigned");
                self.session_id = Some(session_id.to_string());
                Assignment::Stored
            }
            Some(existing) if existing == session_id => Assignment::Unchanged,
            Some(existing) => {
                warn!(
                    existing,
                    received = session_id,
                    "backend created a different session than the one assigned"
                );
                Assignment::Conflict {
                    current: existing.to_string(),
                }
            }
        }
    }

    /// Forgets the identifier; overrides survive.
    pub fn reset(&mut self) {
        self.session_id = None;
    }
}
