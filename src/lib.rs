//! Session and streaming protocol client for a desktop AI agent.
//!
//! One process-wide [`ConnectionManager`] owns the channel to the agent
//! backend. A [`CoworkClient`] consumes its ordered inbound frames: content
//! frames fold into a growing assistant [`Message`] (see [`aggregator`]),
//! control frames go through the [`EventRouter`], and on completion each
//! assistant message is scanned once for `<artifact>` blocks.
//!
//! # Public API Overview
//! - Connect with [`ConnectionManager::connect`] or
//!   [`reconnect::connect_with_backoff`].
//! - Send with [`CoworkClient::send_message`]; empty messages and sends while
//!   disconnected are rejected locally.
//! - Observe with [`CoworkClient::subscribe`] ([`ClientEvent`]).
//! - Wire schema, transports and the REST client live in `cowork_protocol`.

pub mod aggregator;
pub mod artifact;
pub mod client;
pub mod composer;
pub mod config;
pub mod connection;
pub mod conversation;
pub mod error;
pub mod events;
pub mod message;
pub mod reconnect;
pub mod router;
pub mod session;

pub use aggregator::fold;
pub use artifact::{extract_artifacts, Artifact, ArtifactId, ArtifactKind, Extraction};
pub use client::CoworkClient;
pub use composer::{compose_chat, compose_settings, FileSelection, SessionContext};
pub use config::{ClientConfig, TransportKind};
pub use connection::{
    ConnectOutcome, ConnectionHealth, ConnectionManager, ConnectionState, Inbound,
};
pub use conversation::{Change, Conversation};
pub use error::{ComposeError, ConfigError, ConnectError, InboundTaken, SendError};
pub use events::{ClientEvent, EventBus};
pub use message::{Message, MessageId, Role, ToolInvocation};
pub use reconnect::connect_with_backoff;
pub use router::{EventRouter, RouteEffect};
pub use session::{Assignment, Session, SettingsOverrides};

pub use cowork_protocol::{Frame, Request, ToolUse, TransportError};
