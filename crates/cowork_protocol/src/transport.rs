//! Seams between the connection manager and a concrete channel.
//!
//! [`WsConnector`](crate::ws::WsConnector) is the production implementation;
//! mock backends implement the same traits in-process.

use async_trait::async_trait;

use crate::error::TransportError;

/// Write half of an open channel.
#[async_trait]
pub trait FrameSink: Send {
    /// Sends one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Sends a close frame and flushes. Errors are not interesting to callers
    /// that are already tearing down, but are reported anyway.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of an open channel.
#[async_trait]
pub trait FrameSource: Send {
    /// Returns the next text frame.
    ///
    /// `None` means the stream ended without a close frame; a peer close is
    /// reported as `Err(TransportError::Closed { .. })`.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;
}

/// An open channel split into independently owned halves.
pub type Transport = (Box<dyn FrameSink>, Box<dyn FrameSource>);

/// Opens channels to a URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &str) -> Result<Transport, TransportError>;
}
