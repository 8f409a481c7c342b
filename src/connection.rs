//! Lifecycle of the single logical channel to the agent backend.
//!
//! State machine:
//! `Disconnected -> Connecting -> Connected -> Disconnected`, plus
//! `Connected -> Closing -> Disconnected` on deliberate teardown.
//!
//! Every clone of a [`ConnectionManager`] shares one state object. A
//! compare-and-set guard around "begin connecting" collapses concurrent
//! `connect` calls onto one transport open. Inbound frames are delivered in
//! arrival order over one channel taken by the conversation driver.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cowork_protocol::{
    decode_frame, encode_request, Connector, Frame, FrameSink, FrameSource, ProtocolConfig,
    Request, TransportError,
};
use once_cell::sync::OnceCell;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::composer::compose_settings;
use crate::error::{ConnectError, SendError};
use crate::events::{ClientEvent, EventBus};
use crate::session::SettingsOverrides;

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

static PROCESS_WIDE: OnceCell<ConnectionManager> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// This call opened the transport.
    Opened,
    AlreadyConnected,
    /// Another caller is opening; no second transport was started.
    AlreadyConnecting,
}

/// Item of the ordered inbound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Frame(Frame),
    /// The channel went away. `error` is `None` for a deliberate teardown.
    Closed { error: Option<TransportError> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHealth {
    pub state: ConnectionState,
    pub last_error: Option<TransportError>,
}

/// Shared handle to the process's one agent channel.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    connector: Arc<dyn Connector>,
    connect_timeout: Option<Duration>,
    connecting: AtomicBool,
    status: Mutex<Status>,
    /// Open sink tagged with the generation that opened it.
    writer: tokio::sync::Mutex<Option<(u64, Box<dyn FrameSink>)>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    overrides: Mutex<SettingsOverrides>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Inbound>>>,
    events: EventBus,
}

struct Status {
    state: ConnectionState,
    last_error: Option<TransportError>,
    /// Bumped on every open and every teardown; a reader or sink from an
    /// older generation never touches newer state.
    generation: u64,
}

/// Releases the connect guard however `connect` exits.
struct ConnectingGuard<'a>(&'a AtomicBool);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectionManager {
    pub fn new(config: &ProtocolConfig, connector: Arc<dyn Connector>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                url: config.websocket_url(),
                connector,
                connect_timeout: config.connect_timeout,
                connecting: AtomicBool::new(false),
                status: Mutex::new(Status {
                    state: ConnectionState::Disconnected,
                    last_error: None,
                    generation: 0,
                }),
                writer: tokio::sync::Mutex::new(None),
                reader: Mutex::new(None),
                overrides: Mutex::new(SettingsOverrides::default()),
                inbound_tx,
                inbound_rx: Mutex::new(Some(inbound_rx)),
                events: EventBus::new(),
            }),
        }
    }

    /// Returns the process-wide manager, creating it with `init` on first use.
    /// Later calls ignore `init`.
    pub fn process_wide(init: impl FnOnce() -> ConnectionManager) -> ConnectionManager {
        PROCESS_WIDE.get_or_init(init).clone()
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn state(&self) -> ConnectionState {
        lock_unpoisoned(&self.inner.status).state
    }

    pub fn health(&self) -> ConnectionHealth {
        let status = lock_unpoisoned(&self.inner.status);
        ConnectionHealth {
            state: status.state,
            last_error: status.last_error.clone(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Takes the ordered inbound channel. Only the first caller gets it.
    pub fn take_inbound(&self) -> Option<mpsc::UnboundedReceiver<Inbound>> {
        lock_unpoisoned(&self.inner.inbound_rx).take()
    }

    /// Returns true when both handles share one channel.
    pub fn same_channel(&self, other: &ConnectionManager) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn settings_overrides(&self) -> SettingsOverrides {
        lock_unpoisoned(&self.inner.overrides).clone()
    }

    /// Opens the channel unless it is already open or opening.
    ///
    /// Never retries; wrap with [`crate::reconnect::connect_with_backoff`]
    /// for that. On success, pending non-empty settings overrides are sent
    /// before any other frame.
    pub async fn connect(&self) -> Result<ConnectOutcome, ConnectError> {
        if self
            .inner
            .connecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("connect already in progress");
            return Ok(ConnectOutcome::AlreadyConnecting);
        }
        let _guard = ConnectingGuard(&self.inner.connecting);

        let generation = {
            let mut status = lock_unpoisoned(&self.inner.status);
            match status.state {
                ConnectionState::Connected => return Ok(ConnectOutcome::AlreadyConnected),
                ConnectionState::Closing => return Err(ConnectError::Closing),
                ConnectionState::Connecting => return Ok(ConnectOutcome::AlreadyConnecting),
                ConnectionState::Disconnected => {}
            }
            status.state = ConnectionState::Connecting;
            status.generation += 1;
            status.generation
        };
        self.announce(ConnectionState::Connecting);
        info!(url = %self.inner.url, "connecting to agent");

        let (mut sink, source) = match self.open().await {
            Ok(transport) => transport,
            Err(error) => {
                warn!(%error, "agent connection failed");
                self.fail_connect(generation, error.clone());
                return Err(ConnectError::Transport(error));
            }
        };

        // Hold the writer until Connected is visible so the settings frame
        // precedes any chat frame.
        let mut writer = self.inner.writer.lock().await;
        if let Some(request) = compose_settings(&self.settings_overrides()) {
            let sent = match encode_request(&request) {
                Ok(text) => sink.send_text(text).await.map_err(ConnectError::from),
                Err(error) => Err(ConnectError::from(error)),
            };
            if let Err(error) = sent {
                warn!(%error, "failed to send settings on open");
                let _ = sink.close().await;
                let transport_error = match &error {
                    ConnectError::Transport(transport) => transport.clone(),
                    other => TransportError::Send(other.to_string()),
                };
                self.fail_connect(generation, transport_error);
                return Err(error);
            }
            debug!("settings overrides sent on open");
        }
        *writer = Some((generation, sink));
        {
            let mut status = lock_unpoisoned(&self.inner.status);
            status.state = ConnectionState::Connected;
            status.last_error = None;
        }
        drop(writer);

        let reader = tokio::spawn(read_loop(Arc::clone(&self.inner), generation, source));
        if let Some(previous) = lock_unpoisoned(&self.inner.reader).replace(reader) {
            previous.abort();
        }

        info!(url = %self.inner.url, "agent connected");
        self.announce(ConnectionState::Connected);
        Ok(ConnectOutcome::Opened)
    }

    /// Sends one request. Fails with [`SendError::NotConnected`] unless the
    /// channel is open; nothing is queued.
    pub async fn send(&self, request: &Request) -> Result<(), SendError> {
        if self.state() != ConnectionState::Connected {
            return Err(SendError::NotConnected);
        }
        let text = encode_request(request)?;

        let mut writer = self.inner.writer.lock().await;
        let current = self.current_generation();
        let Some((generation, sink)) = writer.as_mut() else {
            return Err(SendError::NotConnected);
        };
        if *generation != current || self.state() != ConnectionState::Connected {
            return Err(SendError::NotConnected);
        }
        let generation = *generation;

        match sink.send_text(text).await {
            Ok(()) => {
                debug!(request_type = request.request_type(), "request sent");
                Ok(())
            }
            Err(error) => {
                *writer = None;
                drop(writer);
                self.inner.connection_lost(generation, error.clone());
                Err(SendError::Transport(error))
            }
        }
    }

    /// Records settings overrides. When connected and the overrides carry
    /// anything, the `settings` frame goes out now; otherwise it goes out on
    /// the next open. Returns true if a frame was sent.
    pub async fn set_settings_overrides(
        &self,
        overrides: SettingsOverrides,
    ) -> Result<bool, SendError> {
        let request = compose_settings(&overrides);
        *lock_unpoisoned(&self.inner.overrides) = overrides;

        let Some(request) = request else {
            return Ok(false);
        };
        if self.state() != ConnectionState::Connected {
            debug!("settings overrides deferred until connected");
            return Ok(false);
        }
        self.send(&request).await?;
        Ok(true)
    }

    /// Deliberately closes the channel. Returns false if it was not open.
    pub async fn disconnect(&self) -> bool {
        {
            let mut status = lock_unpoisoned(&self.inner.status);
            if status.state != ConnectionState::Connected {
                return false;
            }
            status.state = ConnectionState::Closing;
            status.generation += 1;
        }
        self.announce(ConnectionState::Closing);

        if let Some(reader) = lock_unpoisoned(&self.inner.reader).take() {
            reader.abort();
        }
        let sink = self.inner.writer.lock().await.take();
        if let Some((_, mut sink)) = sink {
            if let Err(error) = sink.close().await {
                debug!(%error, "close frame not delivered");
            }
        }

        lock_unpoisoned(&self.inner.status).state = ConnectionState::Disconnected;
        info!("agent connection closed");
        self.announce(ConnectionState::Disconnected);
        let _ = self.inner.inbound_tx.send(Inbound::Closed { error: None });
        true
    }

    async fn open(&self) -> Result<cowork_protocol::Transport, TransportError> {
        let open = self.inner.connector.open(&self.inner.url);
        match self.inner.connect_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, open).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            },
            None => open.await,
        }
    }

    fn fail_connect(&self, generation: u64, error: TransportError) {
        {
            let mut status = lock_unpoisoned(&self.inner.status);
            if status.generation != generation {
                return;
            }
            status.state = ConnectionState::Disconnected;
            status.last_error = Some(error);
        }
        self.announce(ConnectionState::Disconnected);
    }

    fn current_generation(&self) -> u64 {
        lock_unpoisoned(&self.inner.status).generation
    }

    fn announce(&self, state: ConnectionState) {
        self.inner
            .events
            .publish(ClientEvent::ConnectionStateChanged(state));
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        lock_unpoisoned(&self.status).generation == generation
    }

    /// Marks the channel of `generation` as lost. Only the first report for a
    /// generation acts; later ones and stale ones are ignored.
    fn connection_lost(&self, generation: u64, error: TransportError) -> bool {
        {
            let mut status = lock_unpoisoned(&self.status);
            if status.generation != generation || status.state != ConnectionState::Connected {
                return false;
            }
            status.state = ConnectionState::Disconnected;
            status.last_error = Some(error.clone());
            status.generation += 1;
        }

        warn!(%error, "agent connection lost");
        self.events.publish(ClientEvent::ConnectionStateChanged(
            ConnectionState::Disconnected,
        ));
        let _ = self.inbound_tx.send(Inbound::Closed { error: Some(error) });
        true
    }
}

async fn read_loop(inner: Arc<Inner>, generation: u64, mut source: Box<dyn FrameSource>) {
    loop {
        let next = source.next_text().await;
        if !inner.is_current(generation) {
            debug!(generation, "stale reader exiting");
            return;
        }

        let error = match next {
            Some(Ok(text)) => {
                match decode_frame(&text) {
                    Ok(frame) => {
                        debug!(frame_type = frame.frame_type(), "frame received");
                        let _ = inner.inbound_tx.send(Inbound::Frame(frame));
                    }
                    Err(error) => warn!(%error, "dropping malformed frame"),
                }
                continue;
            }
            Some(Err(error)) => error,
            None => TransportError::Closed {
                code: ABNORMAL_CLOSURE,
                reason: "stream ended".to_string(),
            },
        };

        if inner.connection_lost(generation, error) {
            let mut writer = inner.writer.lock().await;
            if matches!(writer.as_ref(), Some((open, _)) if *open == generation) {
                *writer = None;
            }
        }
        return;
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
