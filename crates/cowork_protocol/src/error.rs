use std::time::Duration;

use thiserror::Error;

/// Inbound payload that could not be turned into a frame.
///
/// Decode failures are per-frame: callers log and drop the payload and keep
/// the connection open.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not well-formed JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("payload must be a JSON object with a string `type` field")]
    MissingType,

    #[error("`{frame_type}` payload has an invalid shape: {source}")]
    Shape {
        frame_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported request type `{0}`")]
    UnsupportedRequest(String),
}

#[derive(Debug, Error)]
#[error("failed to encode `{kind}` payload: {source}")]
pub struct EncodeError {
    pub kind: String,
    #[source]
    pub source: serde_json::Error,
}

impl EncodeError {
    #[must_use]
    pub fn new(kind: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            kind: kind.into(),
            source,
        }
    }
}

/// Failure of the persistent channel itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid agent URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("failed to open channel: {0}")]
    Connect(String),

    #[error("channel open timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to write frame: {0}")]
    Send(String),

    #[error("failed to read frame: {0}")]
    Receive(String),

    #[error("channel closed by peer (code {code}){}", format_reason(.reason))]
    Closed { code: u16, reason: String },
}

fn format_reason(reason: &str) -> String {
    if reason.trim().is_empty() {
        String::new()
    } else {
        format!(": {}", reason.trim())
    }
}

/// Failure talking to the agent server's HTTP endpoints.
#[derive(Debug, Error)]
pub enum RestError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{what} not found: {message}")]
    NotFound { what: String, message: String },

    #[error("invalid {what} identifier: {value}")]
    InvalidIdentifier { what: &'static str, value: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}
