//! Transport-only primitives for the cowork agent protocol.
//!
//! This crate owns the wire schema (inbound [`Frame`]s, outbound [`Request`]s),
//! the codec between them and JSON text, the WebSocket transport, and the
//! agent server's small REST surface. It holds no conversation state; folding
//! frames into messages is the client's job.
//!
//! Unknown inbound frame types decode to [`Frame::Unknown`] so that protocol
//! additions on the backend never break an older client.

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod request;
pub mod rest;
pub mod retry;
pub mod transport;
pub mod url;
pub mod ws;

pub use codec::{decode_frame, decode_request, encode_frame, encode_request};
pub use config::ProtocolConfig;
pub use error::{DecodeError, EncodeError, RestError, TransportError};
pub use frame::{Frame, ToolUse};
pub use request::{ChatRequest, Request, SelectedFile, SettingsPayload};
pub use rest::AgentRestClient;
pub use retry::BackoffPolicy;
pub use transport::{Connector, FrameSink, FrameSource, Transport};
pub use url::{normalize_base_url, websocket_url};
pub use ws::WsConnector;
