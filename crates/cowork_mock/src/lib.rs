//! Deterministic in-process agent backend.
//!
//! [`MockBackend`] implements the transport seams from `cowork_protocol`, so a
//! connection manager can run against it unchanged. Each `chat` request is
//! answered with a scripted frame sequence; tests can also gate transport
//! opens, fail them, inject raw inbound text, or drop the live channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use cowork_protocol::{
    decode_request, encode_frame, Connector, Frame, FrameSink, FrameSource, Request, ToolUse,
    Transport, TransportError,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

mod collaborators;

pub use collaborators::{MemoryFileSystem, RecordingApprovalPrompt};

/// Stable transport identifier used for explicit startup selection.
pub const MOCK_TRANSPORT_ID: &str = "mock";

/// Close code the mock sends when told to drop the channel.
pub const MOCK_DROP_CODE: u16 = 1011;

/// Scripted reply to every `chat` request.
#[derive(Debug, Clone, PartialEq)]
pub struct MockScript {
    /// Streamed assistant text, one `stream` frame per chunk.
    pub chunks: Vec<String>,
    /// `tool_call` frames sent before streaming, each followed by a
    /// `file_modified` frame when the args carry a `path`.
    pub tool_calls: Vec<(String, Value)>,
    /// Delay between frames; `None` delivers the whole reply at once.
    pub frame_delay: Option<Duration>,
}

impl MockScript {
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            tool_calls: Vec::new(),
            frame_delay: None,
        }
    }

    #[must_use]
    pub fn with_tool_call(mut self, tool: impl Into<String>, args: Value) -> Self {
        self.tool_calls.push((tool.into(), args));
        self
    }

    #[must_use]
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }

    fn reply(&self, session_id: &str, prompt: &str) -> Vec<Frame> {
        let mut frames = vec![Frame::Thinking {
            message: Some("Thinking...".to_string()),
        }];

        for (tool, args) in &self.tool_calls {
            frames.push(Frame::ToolCall {
                tool: tool.clone(),
                args: args.clone(),
                session_id: Some(session_id.to_string()),
            });
            if let Some(path) = args.get("path").and_then(Value::as_str) {
                frames.push(Frame::FileModified {
                    file_path: path.to_string(),
                    tool: Some(tool.clone()),
                    session_id: Some(session_id.to_string()),
                });
            }
        }

        let chunks = if self.chunks.is_empty() {
            vec![format!("echo: {prompt}")]
        } else {
            self.chunks.clone()
        };
        for chunk in &chunks {
            frames.push(Frame::Stream {
                content: chunk.clone(),
                session_id: Some(session_id.to_string()),
            });
        }

        let tools_used = self
            .tool_calls
            .iter()
            .map(|(tool, args)| ToolUse {
                tool: tool.clone(),
                args: args.clone(),
            })
            .collect::<Vec<_>>();
        frames.push(Frame::Complete {
            tools_used: Some(tools_used),
            content: Some(chunks.concat()),
            session_id: Some(session_id.to_string()),
        });
        frames
    }
}

impl Default for MockScript {
    fn default() -> Self {
        Self::new(vec![
            "Here is a small page you can preview.\n".to_string(),
            "<artifact type=\"html\" title=\"Hello page\">\n".to_string(),
            "<h1>Hello from the mock agent</h1>\n".to_string(),
            "</artifact>\n".to_string(),
            "Edit it and ask again.".to_string(),
        ])
        .with_tool_call("write_file", json!({"path": "hello.html"}))
    }
}

#[derive(Debug)]
enum ServerItem {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Debug)]
struct Shared {
    script: Mutex<MockScript>,
    opens: AtomicUsize,
    failing_opens: AtomicUsize,
    gate: Mutex<Option<Arc<Semaphore>>>,
    sent: Mutex<Vec<Request>>,
    live: Mutex<Option<mpsc::UnboundedSender<ServerItem>>>,
    sessions: AtomicUsize,
}

/// Scripted backend. Clones share state.
#[derive(Debug, Clone)]
pub struct MockBackend {
    shared: Arc<Shared>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(MockScript::default())
    }
}

impl MockBackend {
    #[must_use]
    pub fn new(script: MockScript) -> Self {
        Self {
            shared: Arc::new(Shared {
                script: Mutex::new(script),
                opens: AtomicUsize::new(0),
                failing_opens: AtomicUsize::new(0),
                gate: Mutex::new(None),
                sent: Mutex::new(Vec::new()),
                live: Mutex::new(None),
                sessions: AtomicUsize::new(0),
            }),
        }
    }

    pub fn set_script(&self, script: MockScript) {
        *lock_unpoisoned(&self.shared.script) = script;
    }

    /// Number of transport opens attempted so far.
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Makes the next `count` opens fail with a connect error.
    pub fn fail_next_opens(&self, count: usize) {
        self.shared.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Holds every subsequent open until [`OpenGate::release`] is called.
    pub fn gate_opens(&self) -> OpenGate {
        let semaphore = Arc::new(Semaphore::new(0));
        *lock_unpoisoned(&self.shared.gate) = Some(Arc::clone(&semaphore));
        OpenGate { semaphore }
    }

    /// Requests received so far, decoded.
    pub fn sent_requests(&self) -> Vec<Request> {
        lock_unpoisoned(&self.shared.sent).clone()
    }

    pub fn is_open(&self) -> bool {
        lock_unpoisoned(&self.shared.live)
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Pushes raw text to the client as if the backend sent it. Returns false
    /// when no channel is open.
    pub fn inject_raw(&self, text: impl Into<String>) -> bool {
        self.push(ServerItem::Text(text.into()))
    }

    pub fn inject_frame(&self, frame: &Frame) -> bool {
        match encode_frame(frame) {
            Ok(text) => self.inject_raw(text),
            Err(_) => false,
        }
    }

    /// Closes the live channel from the backend side.
    pub fn drop_connection(&self, reason: impl Into<String>) -> bool {
        let pushed = self.push(ServerItem::Close {
            code: MOCK_DROP_CODE,
            reason: reason.into(),
        });
        lock_unpoisoned(&self.shared.live).take();
        pushed
    }

    fn push(&self, item: ServerItem) -> bool {
        lock_unpoisoned(&self.shared.live)
            .as_ref()
            .is_some_and(|sender| sender.send(item).is_ok())
    }
}

/// Releases gated opens.
#[derive(Debug, Clone)]
pub struct OpenGate {
    semaphore: Arc<Semaphore>,
}

impl OpenGate {
    pub fn release(&self, opens: usize) {
        self.semaphore.add_permits(opens);
    }
}

#[async_trait]
impl Connector for MockBackend {
    async fn open(&self, url: &str) -> Result<Transport, TransportError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        debug!(url, "mock open");

        let gate = lock_unpoisoned(&self.shared.gate).clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| TransportError::Connect("mock gate closed".to_string()))?;
            permit.forget();
        }

        let failing = self
            .shared
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            })
            .is_ok();
        if failing {
            return Err(TransportError::Connect(
                "IO error: Connection refused (os error 111)".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        *lock_unpoisoned(&self.shared.live) = Some(sender.clone());
        Ok((
            Box::new(MockSink {
                shared: Arc::clone(&self.shared),
                to_client: sender,
            }) as Box<dyn FrameSink>,
            Box::new(MockSource { receiver }) as Box<dyn FrameSource>,
        ))
    }
}

struct MockSink {
    shared: Arc<Shared>,
    to_client: mpsc::UnboundedSender<ServerItem>,
}

impl MockSink {
    fn respond(&self, request: &Request) {
        let frames = match request {
            Request::Chat(chat) => {
                let mut frames = Vec::new();
                let session_id = match &chat.session_id {
                    Some(existing) => existing.clone(),
                    None => {
                        let next = self.shared.sessions.fetch_add(1, Ordering::SeqCst) + 1;
                        let minted = format!("mock-session-{next}");
                        frames.push(Frame::SessionCreated {
                            session_id: minted.clone(),
                        });
                        minted
                    }
                };
                let script = lock_unpoisoned(&self.shared.script).clone();
                frames.extend(script.reply(&session_id, &chat.message));
                self.deliver(frames, script.frame_delay);
                return;
            }
            Request::Settings { .. } => vec![Frame::SettingsUpdated {
                status: Some("ok".to_string()),
            }],
        };
        self.deliver(frames, None);
    }

    fn deliver(&self, frames: Vec<Frame>, delay: Option<Duration>) {
        let texts: Vec<String> = frames
            .iter()
            .filter_map(|frame| encode_frame(frame).ok())
            .collect();

        match delay {
            None => {
                for text in texts {
                    let _ = self.to_client.send(ServerItem::Text(text));
                }
            }
            Some(delay) => {
                let sender = self.to_client.clone();
                tokio::spawn(async move {
                    for text in texts {
                        tokio::time::sleep(delay).await;
                        if sender.send(ServerItem::Text(text)).is_err() {
                            return;
                        }
                    }
                });
            }
        }
    }
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.to_client.is_closed() {
            return Err(TransportError::Send("mock channel closed".to_string()));
        }
        let request =
            decode_request(&text).map_err(|error| TransportError::Send(error.to_string()))?;
        lock_unpoisoned(&self.shared.sent).push(request.clone());
        self.respond(&request);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let _ = self.to_client.send(ServerItem::Close {
            code: 1000,
            reason: String::new(),
        });
        lock_unpoisoned(&self.shared.live).take();
        Ok(())
    }
}

struct MockSource {
    receiver: mpsc::UnboundedReceiver<ServerItem>,
}

#[async_trait]
impl FrameSource for MockSource {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        match self.receiver.recv().await? {
            ServerItem::Text(text) => Some(Ok(text)),
            ServerItem::Close { code, reason } => {
                self.receiver.close();
                Some(Err(TransportError::Closed { code, reason }))
            }
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
