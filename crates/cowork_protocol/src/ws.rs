//! WebSocket implementation of the transport seams over `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, client::IntoClientRequest};
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::transport::{Connector, FrameSink, FrameSource, Transport};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Close code reported when the peer sent a close frame without a payload.
const NO_STATUS_CODE: u16 = 1005;

/// Opens `ws://` / `wss://` channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<Transport, TransportError> {
        let request = url
            .into_client_request()
            .map_err(|error| TransportError::InvalidUrl {
                url: url.to_string(),
                message: error.to_string(),
            })?;

        let (stream, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        debug!(url, status = %response.status(), "websocket handshake completed");

        let (sink, stream) = stream.split();
        Ok((
            Box::new(WsSink { sink }) as Box<dyn FrameSink>,
            Box::new(WsSource { stream }) as Box<dyn FrameSource>,
        ))
    }
}

struct WsSink {
    sink: SplitSink<WsStream, tungstenite::Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(tungstenite::Message::Text(text))
            .await
            .map_err(|error| TransportError::Send(error.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Peer may already be gone; a failed close frame still closes the sink.
        let _ = self.sink.send(tungstenite::Message::Close(None)).await;
        self.sink
            .close()
            .await
            .map_err(|error| TransportError::Send(error.to_string()))
    }
}

struct WsSource {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(tungstenite::Message::Text(text)) => return Some(Ok(text)),
                Ok(tungstenite::Message::Binary(data)) => match binary_text(data) {
                    Some(text) => return Some(Ok(text)),
                    None => warn!("dropping malformed frame: binary payload is not UTF-8"),
                },
                Ok(tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_)) => {
                    trace!("websocket keepalive frame");
                }
                Ok(tungstenite::Message::Frame(_)) => {}
                Ok(tungstenite::Message::Close(close_frame)) => {
                    let (code, reason) = close_frame
                        .map(|frame| (u16::from(frame.code), frame.reason.to_string()))
                        .unwrap_or((NO_STATUS_CODE, String::new()));
                    return Some(Err(TransportError::Closed { code, reason }));
                }
                Err(error) => return Some(Err(TransportError::Receive(error.to_string()))),
            }
        }
    }
}

/// Binary frames carry the same JSON as text frames. Invalid UTF-8 is
/// malformed input, not a reason to drop the connection.
fn binary_text(data: Vec<u8>) -> Option<String> {
    String::from_utf8(data).ok()
}
