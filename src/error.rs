use cowork_protocol::{EncodeError, TransportError};
use thiserror::Error;

/// Outbound request rejected before transmission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Error)]
pub enum SendError {
    /// The channel is not open. Nothing was buffered.
    #[error("not connected to the agent")]
    NotConnected,

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Transport(TransportError),
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("connection is closing")]
    Closing,
}

impl ConnectError {
    /// Transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(error) => Some(error),
            Self::Encode(_) | Self::Closing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be a port number, got '{value}'")]
    InvalidPort { key: &'static str, value: String },

    #[error("{key} must be a whole number of seconds, got '{value}'")]
    InvalidTimeout { key: &'static str, value: String },

    #[error("{key} must be one of: ws, mock; got '{value}'")]
    UnknownTransport { key: &'static str, value: String },
}

/// The connection's inbound frames were already taken by another consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("inbound frames are already consumed by another client")]
pub struct InboundTaken;
