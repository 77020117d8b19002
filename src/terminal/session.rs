// ABOUTME: Per-slot terminal session: owns the stream, the emulator view and geometry state
//
// State machine: Idle -> Connecting (launch) -> Open (stream opened) -> Closed
// (explicit close, remote close or failure). Closed only leaves through a new
// launch, which starts a new generation. Events tagged with an older
// generation are ignored.

use crate::events::DeckEvent;
use crate::models::{AgentKind, SessionState, Slot, TerminalGeometry};
use crate::terminal::geometry::{ContainerSize, FitPass, GeometryAdapter};
use crate::terminal::scanner::scan_chunk;
use crate::terminal::stream::{
    OutboundFrame, StreamConnection, StreamConnector, StreamError, StreamEvent, StreamParams,
    StreamSink,
};
use crate::terminal::view::{TerminalView, ViewFactory};
use crossterm::event::KeyEvent;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Shared across sessions so a slot recreated after a layout change can never
// reuse a generation its predecessor handed out.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Slot {slot} cannot launch while {state}")]
    InvalidState { slot: usize, state: &'static str },

    #[error("Session is not open")]
    NotOpen,

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Connector and view factory a session launches with
#[derive(Clone)]
pub struct SessionBackends {
    pub connector: Arc<dyn StreamConnector>,
    pub views: Arc<dyn ViewFactory>,
}

impl SessionBackends {
    pub fn new(connector: Arc<dyn StreamConnector>, views: Arc<dyn ViewFactory>) -> Self {
        Self { connector, views }
    }
}

pub struct TerminalSession {
    slot: Slot,
    state: SessionState,
    generation: u64,
    view: Option<Box<dyn TerminalView>>,
    connection: Option<Box<dyn StreamConnection>>,
    geometry: GeometryAdapter,
    settle_timers: Vec<JoinHandle<()>>,
    events: Option<mpsc::UnboundedSender<DeckEvent>>,
    active_file: Option<String>,
    fallback_geometry: TerminalGeometry,
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("slot", &self.slot.id)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("active_file", &self.active_file)
            .finish()
    }
}

impl TerminalSession {
    pub fn new(slot: Slot, geometry: GeometryAdapter, fallback_geometry: TerminalGeometry) -> Self {
        Self {
            slot,
            state: SessionState::Idle,
            generation: 0,
            view: None,
            connection: None,
            geometry,
            settle_timers: Vec::new(),
            events: None,
            active_file: None,
            fallback_geometry,
        }
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn set_layout_capacity(&mut self, capacity: usize) {
        self.slot.layout_capacity = capacity;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Most recent file path seen in the output
    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    /// Connecting or Open
    pub fn is_live(&self) -> bool {
        matches!(self.state, SessionState::Connecting | SessionState::Open)
    }

    pub fn view_geometry(&self) -> Option<TerminalGeometry> {
        self.view.as_ref().map(|v| v.geometry())
    }

    pub fn last_sent_geometry(&self) -> Option<TerminalGeometry> {
        self.geometry.last_sent()
    }

    pub fn launch(
        &mut self,
        agent: AgentKind,
        yolo: bool,
        backends: &SessionBackends,
        events: &mpsc::UnboundedSender<DeckEvent>,
    ) -> Result<(), SessionError> {
        if !self.state.can_launch() {
            return Err(SessionError::InvalidState {
                slot: self.slot.id,
                state: self.state.label(),
            });
        }

        // A previous run may still hold its view for the closing banner
        self.release();

        self.generation = next_generation();
        self.slot.agent_kind = agent;
        self.slot.yolo = yolo;
        self.active_file = None;
        self.events = Some(events.clone());
        self.geometry.reset_remote();

        let geometry = self.geometry.fit().unwrap_or(self.fallback_geometry);
        self.view = Some(backends.views.create(geometry));
        self.state = SessionState::Connecting;

        info!(
            "Launching {} in slot {} (generation {}, {}, yolo={})",
            agent,
            self.slot.number(),
            self.generation,
            geometry,
            yolo
        );

        let params = StreamParams {
            agent,
            cwd: self.slot.working_directory.clone(),
            geometry,
            yolo,
        };
        let sink = StreamSink::new(self.slot.id, self.generation, events.clone());
        match backends.connector.open(params, sink) {
            Ok(connection) => {
                self.connection = Some(connection);
                self.geometry.mark_sent(geometry);
                Ok(())
            }
            Err(err) => {
                warn!("Slot {} failed to connect: {}", self.slot.number(), err);
                self.fail(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Apply a stream event. Returns the active file when this event changed it.
    pub fn handle_stream_event(&mut self, generation: u64, event: StreamEvent) -> Option<String> {
        if generation != self.generation {
            debug!(
                "Dropping stale stream event for slot {} (generation {} != {})",
                self.slot.number(),
                generation,
                self.generation
            );
            return None;
        }

        match event {
            StreamEvent::Opened => {
                if self.state != SessionState::Connecting {
                    return None;
                }
                let banner = mode_banner(self.slot.agent_kind, self.slot.yolo);
                self.write_to_view(banner.as_bytes());
                self.state = SessionState::Open;
                info!("Slot {} stream open", self.slot.number());
                // The container may have moved while the stream was connecting
                self.run_fit(FitPass::Immediate);
                None
            }
            StreamEvent::Data(bytes) => {
                if !self.is_live() {
                    return None;
                }
                self.write_to_view(&bytes);
                let candidate = scan_chunk(&bytes)?;
                if self.active_file.as_deref() == Some(candidate.as_str()) {
                    return None;
                }
                self.active_file = Some(candidate.clone());
                Some(candidate)
            }
            StreamEvent::Closed(reason) => {
                if !self.is_live() {
                    return None;
                }
                let reason = reason.filter(|r| !r.is_empty());
                info!(
                    "Slot {} stream closed: {}",
                    self.slot.number(),
                    reason.as_deref().unwrap_or("remote closed")
                );
                let text = match reason {
                    Some(reason) => format!("\r\n\x1b[33m[session closed: {}]\x1b[0m\r\n", reason),
                    None => "\r\n\x1b[33m[session closed]\x1b[0m\r\n".to_string(),
                };
                self.write_to_view(text.as_bytes());
                self.drop_stream();
                None
            }
            StreamEvent::Failed(error) => {
                if !self.is_live() {
                    return None;
                }
                warn!("Slot {} stream failed: {}", self.slot.number(), error);
                self.fail(&error);
                None
            }
        }
    }

    /// Forward a key press. Dropped silently unless the session is open.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Result<(), SessionError> {
        if self.state != SessionState::Open {
            return Ok(());
        }
        let Some(bytes) = self.view.as_ref().and_then(|v| v.input(key)) else {
            return Ok(());
        };
        self.send_input(&bytes)
    }

    /// Forward pasted text. Dropped silently unless the session is open.
    pub fn paste(&mut self, text: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Open {
            return Ok(());
        }
        let Some(bytes) = self.view.as_ref().map(|v| v.paste(text)) else {
            return Ok(());
        };
        self.send_input(&bytes)
    }

    /// Send raw text upstream
    pub fn send_input(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        if self.state != SessionState::Open {
            return Err(SessionError::NotOpen);
        }
        let connection = self.connection.as_mut().ok_or(SessionError::NotOpen)?;
        connection.send(OutboundFrame::Input(bytes.to_vec()))?;
        Ok(())
    }

    /// New container size for this slot. Fits right away and schedules the
    /// settle passes when the size actually changed.
    pub fn observe_container(&mut self, size: ContainerSize) {
        if !self.geometry.record(size) {
            return;
        }
        if !self.is_live() {
            return;
        }
        self.run_fit(FitPass::Immediate);
        self.schedule_settle();
    }

    /// A settle timer fired
    pub fn on_settle(&mut self, generation: u64, pass: FitPass) -> Option<TerminalGeometry> {
        if generation != self.generation || !self.is_live() {
            debug!(
                "Ignoring {:?} settle for slot {} (generation {})",
                pass,
                self.slot.number(),
                generation
            );
            return None;
        }
        self.run_fit(pass)
    }

    /// Fit the view to the container and send a resize frame if needed.
    /// Returns the geometry that was sent.
    pub fn run_fit(&mut self, pass: FitPass) -> Option<TerminalGeometry> {
        let geometry = match self.geometry.fit() {
            Ok(geometry) => geometry,
            Err(err) => {
                debug!("Slot {} fit skipped: {}", self.slot.number(), err);
                return None;
            }
        };
        if let Some(view) = self.view.as_mut() {
            view.resize(geometry);
        }
        if !self.geometry.needs_frame(geometry, pass) {
            return None;
        }
        let connection = self.connection.as_mut()?;
        match connection.send(OutboundFrame::Resize(geometry)) {
            Ok(()) => {
                debug!(
                    "Slot {} resize {} ({:?} pass)",
                    self.slot.number(),
                    geometry,
                    pass
                );
                self.geometry.mark_sent(geometry);
                Some(geometry)
            }
            Err(err) => {
                warn!("Slot {} resize frame not sent: {}", self.slot.number(), err);
                None
            }
        }
    }

    /// Idempotent. Stops timers, disposes the view, closes the stream.
    pub fn close(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.release();
        if self.state != SessionState::Closed {
            info!("Slot {} closed", self.slot.number());
            self.state = SessionState::Closed;
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        if let Some(view) = self.view.as_ref() {
            view.render(area, buf);
        }
    }

    fn schedule_settle(&mut self) {
        self.cancel_timers();
        let Some(events) = self.events.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let delays = self.geometry.delays();
        for (pass, delay) in [(FitPass::Short, delays.short), (FitPass::Long, delays.long)] {
            let events = events.clone();
            let slot = self.slot.id;
            let generation = self.generation;
            self.settle_timers.push(runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(DeckEvent::FitSettle {
                    slot,
                    generation,
                    pass,
                });
            }));
        }
    }

    fn cancel_timers(&mut self) {
        for timer in self.settle_timers.drain(..) {
            timer.abort();
        }
    }

    fn write_to_view(&mut self, bytes: &[u8]) {
        if let Some(view) = self.view.as_mut() {
            view.write(bytes);
        }
    }

    /// Show the error in the terminal and end the session. The view stays
    /// until an explicit close so the message remains visible.
    fn fail(&mut self, error: &str) {
        let text = format!("\r\n\x1b[31m[connection failed: {}]\x1b[0m\r\n", error);
        self.write_to_view(text.as_bytes());
        self.drop_stream();
    }

    fn drop_stream(&mut self) {
        self.cancel_timers();
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        self.state = SessionState::Closed;
    }

    fn release(&mut self) {
        self.cancel_timers();
        if let Some(mut view) = self.view.take() {
            view.dispose();
        }
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.release();
    }
}

fn mode_banner(agent: AgentKind, yolo: bool) -> String {
    if yolo {
        format!(
            "\x1b[1;31m[{} session | YOLO mode: permission prompts skipped]\x1b[0m\r\n",
            agent
        )
    } else {
        format!("\x1b[2m[{} session | normal mode]\x1b[0m\r\n", agent)
    }
}
