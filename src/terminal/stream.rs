// ABOUTME: Bidirectional stream to a PTY-backed process, plus the websocket transport
//
// A `StreamConnector` opens one connection per launch. Inbound traffic is not
// returned from a call; it is posted to the app queue through a `StreamSink`
// tagged with the slot and launch generation, so a session never sees events
// from a connection it has already torn down.

use crate::events::DeckEvent;
use crate::models::{AgentKind, TerminalGeometry};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid stream endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Agent command not found: {0}")]
    AgentNotFound(String),

    #[error("PTY error: {0}")]
    Pty(String),

    #[error("Connection is closed")]
    Closed,

    #[error("No async runtime available to drive the connection")]
    NoRuntime,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parameters a connection is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamParams {
    pub agent: AgentKind,
    pub cwd: PathBuf,
    pub geometry: TerminalGeometry,
    pub yolo: bool,
}

/// Something to send upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Keystrokes or injected text, passed through verbatim
    Input(Vec<u8>),
    /// Geometry change, sent as a JSON control frame
    Resize(TerminalGeometry),
}

impl OutboundFrame {
    /// JSON text of a control frame, `None` for plain input
    pub fn control_json(&self) -> Option<String> {
        match self {
            OutboundFrame::Input(_) => None,
            OutboundFrame::Resize(geometry) => Some(resize_json(*geometry)),
        }
    }

    fn into_message(self) -> Message {
        match self {
            OutboundFrame::Input(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Message::Text(text),
                Err(err) => Message::Binary(err.into_bytes()),
            },
            OutboundFrame::Resize(geometry) => Message::Text(resize_json(geometry)),
        }
    }
}

fn resize_json(geometry: TerminalGeometry) -> String {
    json!({"type": "resize", "cols": geometry.cols, "rows": geometry.rows}).to_string()
}

/// Inbound activity on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Opened,
    Data(Vec<u8>),
    /// Remote side ended the stream
    Closed(Option<String>),
    /// Transport error; the stream is gone
    Failed(String),
}

/// Posts stream events for one slot launch into the app queue
#[derive(Debug, Clone)]
pub struct StreamSink {
    slot: usize,
    generation: u64,
    tx: mpsc::UnboundedSender<DeckEvent>,
}

impl StreamSink {
    pub fn new(slot: usize, generation: u64, tx: mpsc::UnboundedSender<DeckEvent>) -> Self {
        Self {
            slot,
            generation,
            tx,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the app side has gone away
    pub fn emit(&self, event: StreamEvent) -> bool {
        self.tx
            .send(DeckEvent::Stream {
                slot: self.slot,
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn opened(&self) -> bool {
        self.emit(StreamEvent::Opened)
    }

    pub fn data(&self, bytes: Vec<u8>) -> bool {
        self.emit(StreamEvent::Data(bytes))
    }

    pub fn closed(&self, reason: Option<String>) -> bool {
        self.emit(StreamEvent::Closed(reason))
    }

    pub fn failed(&self, error: impl Into<String>) -> bool {
        self.emit(StreamEvent::Failed(error.into()))
    }
}

/// Handle to an open (or opening) connection
pub trait StreamConnection: Send {
    fn send(&mut self, frame: OutboundFrame) -> Result<(), StreamError>;

    /// Tear the connection down. Safe to call more than once.
    fn close(&mut self);
}

/// Opens connections. Opening never blocks: `Opened` arrives through the sink.
pub trait StreamConnector: Send + Sync {
    fn open(
        &self,
        params: StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn StreamConnection>, StreamError>;
}

/// Connects to the remote PTY endpoint over a websocket
#[derive(Debug, Clone)]
pub struct WsStreamConnector {
    base: Url,
}

impl WsStreamConnector {
    pub fn new(server_url: &str) -> Result<Self, StreamError> {
        let base =
            Url::parse(server_url).map_err(|e| StreamError::InvalidEndpoint(e.to_string()))?;
        Ok(Self { base })
    }

    /// `ws(s)://host/ws/terminal?agent=..&cwd=..&cols=..&rows=..&yolo=..`
    pub fn endpoint(&self, params: &StreamParams) -> Result<Url, StreamError> {
        let mut url = websocket_url(&self.base, "ws/terminal")?;
        url.query_pairs_mut()
            .append_pair("agent", params.agent.as_str())
            .append_pair("cwd", &params.cwd.to_string_lossy())
            .append_pair("cols", &params.geometry.cols.to_string())
            .append_pair("rows", &params.geometry.rows.to_string())
            .append_pair("yolo", if params.yolo { "1" } else { "0" });
        Ok(url)
    }
}

/// Join `path` onto an http(s) or ws(s) base and switch to the websocket scheme
pub(crate) fn websocket_url(base: &Url, path: &str) -> Result<Url, StreamError> {
    let mut url = base
        .join(path)
        .map_err(|e| StreamError::InvalidEndpoint(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(StreamError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| StreamError::InvalidEndpoint(base.to_string()))?;
    Ok(url)
}

impl StreamConnector for WsStreamConnector {
    fn open(
        &self,
        params: StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn StreamConnection>, StreamError> {
        let url = self.endpoint(&params)?;
        let runtime = Handle::try_current().map_err(|_| StreamError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();
        info!(
            "Opening terminal stream for slot {} ({}): {}",
            sink.slot(),
            params.agent,
            url
        );
        runtime.spawn(run_socket(url, rx, sink));
        Ok(Box::new(WsConnection { outbound: Some(tx) }))
    }
}

struct WsConnection {
    outbound: Option<mpsc::UnboundedSender<OutboundFrame>>,
}

impl StreamConnection for WsConnection {
    fn send(&mut self, frame: OutboundFrame) -> Result<(), StreamError> {
        let outbound = self.outbound.as_ref().ok_or(StreamError::Closed)?;
        outbound.send(frame).map_err(|_| StreamError::Closed)
    }

    fn close(&mut self) {
        // Dropping the sender makes the socket task send a close frame and exit
        self.outbound.take();
    }
}

async fn run_socket(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    sink: StreamSink,
) {
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(err) => {
            warn!("Terminal stream connect failed for slot {}: {}", sink.slot(), err);
            sink.failed(err.to_string());
            return;
        }
    };
    sink.opened();

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if !sink.data(text.into_bytes()) {
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    if !sink.data(bytes) {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    sink.closed(frame.map(|f| f.reason.to_string()));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    sink.failed(err.to_string());
                    break;
                }
                None => {
                    sink.closed(None);
                    break;
                }
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = write.send(frame.into_message()).await {
                        sink.failed(err.to_string());
                        break;
                    }
                }
                None => {
                    debug!("Closing terminal stream for slot {}", sink.slot());
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}
