//! Client for the agent server's HTTP endpoints.
//!
//! The server answers "not found" with a `200` carrying an `error` object
//! (sometimes wrapped as `[{"error": ...}, 404]`), so every body is checked
//! for an embedded error before it is decoded.

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ProtocolConfig;
use crate::error::RestError;
use crate::frame::ToolUse;
use crate::url::rest_url;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "healthy" | "ok")
    }
}

/// One row of `GET /sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub work_dir: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub message_count: usize,
}

/// Persisted message inside a stored session.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoredMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub tools_used: Vec<ToolUse>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub work_dir: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Backend-side settings; the API key is masked by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteSettings {
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<SessionSummary>,
}

#[derive(Debug)]
pub struct AgentRestClient {
    http: Client,
    base_url: String,
}

impl AgentRestClient {
    pub fn new(config: &ProtocolConfig) -> Result<Self, RestError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, RestError> {
        self.request(Method::GET, "/health", "health").await
    }

    /// Most recent sessions first, as ordered by the server.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, RestError> {
        let list: SessionList = self.request(Method::GET, "/sessions", "sessions").await?;
        Ok(list.sessions)
    }

    pub async fn session(&self, session_id: &str) -> Result<SessionRecord, RestError> {
        let path = session_path(session_id)?;
        self.request(Method::GET, &path, "session").await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), RestError> {
        let path = session_path(session_id)?;
        let _: Value = self.request(Method::DELETE, &path, "session").await?;
        Ok(())
    }

    pub async fn settings(&self) -> Result<RemoteSettings, RestError> {
        self.request(Method::GET, "/settings", "settings").await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        what: &str,
    ) -> Result<T, RestError> {
        let url = rest_url(&self.base_url, path);
        debug!(%method, %url, "agent rest request");
        let response = self.http.request(method, &url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let value = serde_json::from_str::<Value>(&body).ok();
        if let Some(message) = value.as_ref().and_then(embedded_error) {
            return Err(RestError::NotFound {
                what: what.to_string(),
                message,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RestError::NotFound {
                what: what.to_string(),
                message: status.canonical_reason().unwrap_or("not found").to_string(),
            });
        }
        if !status.is_success() {
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            };
            return Err(RestError::Status {
                status: status.as_u16(),
                message,
            });
        }

        match value {
            Some(value) => serde_json::from_value(value).map_err(RestError::Decode),
            None => serde_json::from_str(&body).map_err(RestError::Decode),
        }
    }
}

fn session_path(session_id: &str) -> Result<String, RestError> {
    let trimmed = session_id.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '?', '#']) {
        return Err(RestError::InvalidIdentifier {
            what: "session",
            value: session_id.to_string(),
        });
    }
    Ok(format!("/sessions/{trimmed}"))
}

/// Returns the message of an `{"error": ...}` body, bare or wrapped in a
/// `[body, status]` pair.
fn embedded_error(value: &Value) -> Option<String> {
    let object = match value {
        Value::Object(_) => value,
        Value::Array(items) => items.first()?,
        _ => return None,
    };
    let error = object.as_object()?.get("error")?;
    Some(match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{embedded_error, session_path};
    use crate::error::RestError;

    #[test]
    fn embedded_error_reads_bare_and_wrapped_bodies() {
        assert_eq!(
            embedded_error(&json!({"error": "Session not found"})).as_deref(),
            Some("Session not found")
        );
        assert_eq!(
            embedded_error(&json!([{"error": "Session not found"}, 404])).as_deref(),
            Some("Session not found")
        );
        assert_eq!(embedded_error(&json!({"status": "deleted"})), None);
        assert_eq!(embedded_error(&json!([1, 2])), None);
    }

    #[test]
    fn session_path_rejects_path_separators() {
        assert_eq!(
            session_path(" 20240101_120000 ").expect("valid id"),
            "/sessions/20240101_120000"
        );
        assert!(matches!(
            session_path("../etc"),
            Err(RestError::InvalidIdentifier { what: "session", .. })
        ));
        assert!(session_path("  ").is_err());
    }
}
