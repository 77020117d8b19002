// ABOUTME: Owns the slot sessions for the active layout and the focus pointer
//
// Sessions are addressed by slot id, never by reference. The focus pointer is
// only written through `record_focus` and only read by the injection and key
// routing paths.

use crate::events::DeckEvent;
use crate::models::{AgentKind, GridLayout, Slot, TerminalGeometry};
use crate::terminal::{
    CellMetrics, ContainerSize, FitPass, GeometryAdapter, SessionBackends, SessionError,
    SettleDelays, StreamEvent, TerminalSession,
};
use crossterm::event::KeyEvent;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Slot {0} is not in the current layout")]
    NoSuchSlot(usize),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Per-slot defaults applied when a slot is created
#[derive(Debug, Clone)]
pub struct SlotSettings {
    pub working_directory: PathBuf,
    pub cell_metrics: CellMetrics,
    pub settle: SettleDelays,
    pub fallback_geometry: TerminalGeometry,
}

impl SlotSettings {
    pub fn new(working_directory: PathBuf) -> Self {
        Self {
            working_directory,
            cell_metrics: CellMetrics::default(),
            settle: SettleDelays::default(),
            fallback_geometry: TerminalGeometry::default(),
        }
    }
}

pub struct SlotManager {
    layout: GridLayout,
    sessions: Vec<TerminalSession>,
    focus: usize,
    settings: SlotSettings,
    backends: SessionBackends,
    events: mpsc::UnboundedSender<DeckEvent>,
}

impl std::fmt::Debug for SlotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotManager")
            .field("layout", &self.layout)
            .field("sessions", &self.sessions)
            .field("focus", &self.focus)
            .finish()
    }
}

impl SlotManager {
    pub fn new(
        layout: GridLayout,
        settings: SlotSettings,
        backends: SessionBackends,
        events: mpsc::UnboundedSender<DeckEvent>,
    ) -> Self {
        let mut manager = Self {
            layout,
            sessions: Vec::new(),
            focus: 0,
            settings,
            backends,
            events,
        };
        manager.resize_to(layout.capacity());
        manager
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn capacity(&self) -> usize {
        self.sessions.len()
    }

    /// Switch layout. Sessions beyond the new capacity are closed and dropped;
    /// the rest are kept as they are. Returns the ids that were removed.
    pub fn set_layout(&mut self, layout: GridLayout) -> Vec<usize> {
        let previous = self.layout;
        self.layout = layout;
        let removed = self.resize_to(layout.capacity());
        if self.focus >= self.sessions.len() {
            self.focus = self.sessions.len().saturating_sub(1);
        }
        info!(
            "Layout {} -> {} ({} slots, removed {:?})",
            previous,
            layout,
            self.sessions.len(),
            removed
        );
        removed
    }

    fn resize_to(&mut self, capacity: usize) -> Vec<usize> {
        let mut removed = Vec::new();
        while self.sessions.len() > capacity {
            if let Some(mut session) = self.sessions.pop() {
                session.close();
                removed.push(session.slot().id);
            }
        }
        for session in &mut self.sessions {
            session.set_layout_capacity(capacity);
        }
        while self.sessions.len() < capacity {
            let id = self.sessions.len();
            let slot = Slot::new(id, capacity, self.settings.working_directory.clone());
            let geometry = GeometryAdapter::new(self.settings.cell_metrics, self.settings.settle);
            self.sessions.push(TerminalSession::new(
                slot,
                geometry,
                self.settings.fallback_geometry,
            ));
        }
        removed.reverse();
        removed
    }

    pub fn record_focus(&mut self, slot: usize) -> Result<(), SlotError> {
        if slot >= self.sessions.len() {
            return Err(SlotError::NoSuchSlot(slot));
        }
        self.focus = slot;
        Ok(())
    }

    pub fn focused(&self) -> usize {
        self.focus
    }

    /// Send `text` to one session: `target`, or the focused slot
    pub fn inject(&mut self, text: &str, target: Option<usize>) -> Result<usize, SlotError> {
        let slot = target.unwrap_or(self.focus);
        let session = self
            .sessions
            .get_mut(slot)
            .ok_or(SlotError::NoSuchSlot(slot))?;
        session.send_input(text.as_bytes())?;
        debug!("Injected {} bytes into slot {}", text.len(), slot + 1);
        Ok(slot)
    }

    /// Launch in `slot`. Returns the new generation.
    pub fn launch(&mut self, slot: usize, agent: AgentKind, yolo: bool) -> Result<u64, SlotError> {
        let session = self
            .sessions
            .get_mut(slot)
            .ok_or(SlotError::NoSuchSlot(slot))?;
        session.launch(agent, yolo, &self.backends, &self.events)?;
        Ok(session.generation())
    }

    pub fn close(&mut self, slot: usize) -> Result<(), SlotError> {
        let session = self
            .sessions
            .get_mut(slot)
            .ok_or(SlotError::NoSuchSlot(slot))?;
        session.close();
        Ok(())
    }

    pub fn close_all(&mut self) {
        for session in &mut self.sessions {
            session.close();
        }
    }

    /// Route a stream event. Returns the slot's new active file, if any.
    pub fn handle_stream(
        &mut self,
        slot: usize,
        generation: u64,
        event: StreamEvent,
    ) -> Option<String> {
        match self.sessions.get_mut(slot) {
            Some(session) => session.handle_stream_event(generation, event),
            None => {
                debug!("Stream event for removed slot {}", slot);
                None
            }
        }
    }

    pub fn handle_settle(&mut self, slot: usize, generation: u64, pass: FitPass) {
        if let Some(session) = self.sessions.get_mut(slot) {
            session.on_settle(generation, pass);
        }
    }

    pub fn observe_container(&mut self, slot: usize, size: ContainerSize) {
        if let Some(session) = self.sessions.get_mut(slot) {
            session.observe_container(size);
        }
    }

    pub fn send_key_to_focused(&mut self, key: &KeyEvent) -> Result<(), SlotError> {
        let focus = self.focus;
        let session = self
            .sessions
            .get_mut(focus)
            .ok_or(SlotError::NoSuchSlot(focus))?;
        session.handle_key(key)?;
        Ok(())
    }

    pub fn paste_to_focused(&mut self, text: &str) -> Result<(), SlotError> {
        let focus = self.focus;
        let session = self
            .sessions
            .get_mut(focus)
            .ok_or(SlotError::NoSuchSlot(focus))?;
        session.paste(text)?;
        Ok(())
    }

    pub fn session(&self, slot: usize) -> Option<&TerminalSession> {
        self.sessions.get(slot)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &TerminalSession> {
        self.sessions.iter()
    }

    /// `(slot, generation)` for every connecting or open session, in slot order
    pub fn live_targets(&self) -> Vec<(usize, u64)> {
        self.sessions
            .iter()
            .filter(|s| s.is_live())
            .map(|s| (s.slot().id, s.generation()))
            .collect()
    }

    pub fn generation_of(&self, slot: usize) -> Option<u64> {
        self.sessions.get(slot).map(|s| s.generation())
    }

    /// Whether `(slot, generation)` still names a live session
    pub fn is_current(&self, slot: usize, generation: u64) -> bool {
        self.sessions
            .get(slot)
            .is_some_and(|s| s.is_live() && s.generation() == generation)
    }
}

impl Drop for SlotManager {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionState;
    use crate::terminal::{
        OutboundFrame, StreamConnection, StreamConnector, StreamError, StreamParams, StreamSink,
        Vt100ViewFactory,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Wire {
        frames: Mutex<Vec<(usize, OutboundFrame)>>,
    }

    struct FakeConnector(Arc<Wire>);

    struct FakeConnection {
        slot: usize,
        wire: Arc<Wire>,
    }

    impl StreamConnection for FakeConnection {
        fn send(&mut self, frame: OutboundFrame) -> Result<(), StreamError> {
            self.wire.frames.lock().unwrap().push((self.slot, frame));
            Ok(())
        }

        fn close(&mut self) {}
    }

    impl StreamConnector for FakeConnector {
        fn open(
            &self,
            _params: StreamParams,
            sink: StreamSink,
        ) -> Result<Box<dyn StreamConnection>, StreamError> {
            sink.opened();
            Ok(Box::new(FakeConnection {
                slot: sink.slot(),
                wire: self.0.clone(),
            }))
        }
    }

    fn manager(layout: GridLayout) -> (SlotManager, Arc<Wire>, mpsc::UnboundedReceiver<DeckEvent>) {
        let wire = Arc::new(Wire::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let backends = SessionBackends::new(
            Arc::new(FakeConnector(wire.clone())),
            Arc::new(Vt100ViewFactory { scrollback: 0 }),
        );
        let manager = SlotManager::new(
            layout,
            SlotSettings::new(PathBuf::from("/work")),
            backends,
            tx,
        );
        (manager, wire, rx)
    }

    fn open(manager: &mut SlotManager, slot: usize) {
        let generation = manager.launch(slot, AgentKind::Claude, false).unwrap();
        manager.handle_stream(slot, generation, StreamEvent::Opened);
    }

    #[test]
    fn test_layout_sizes_slots() {
        let (manager, _, _) = manager(GridLayout::Grid3x2);
        assert_eq!(manager.capacity(), 6);
        assert_eq!(manager.session(5).unwrap().slot().layout_capacity, 6);
    }

    #[test]
    fn test_shrinking_closes_extra_sessions_and_keeps_the_rest() {
        let (mut manager, _, _) = manager(GridLayout::Grid2x2);
        open(&mut manager, 0);
        open(&mut manager, 3);
        let kept_generation = manager.generation_of(0).unwrap();

        let removed = manager.set_layout(GridLayout::Pair);
        assert_eq!(removed, vec![2, 3]);
        assert_eq!(manager.capacity(), 2);
        assert_eq!(manager.session(0).unwrap().state(), SessionState::Open);
        assert_eq!(manager.generation_of(0), Some(kept_generation));

        manager.set_layout(GridLayout::Grid2x2);
        assert_eq!(manager.session(3).unwrap().state(), SessionState::Idle);
    }

    #[test]
    fn test_focus_is_clamped_on_shrink() {
        let (mut manager, _, _) = manager(GridLayout::Grid4x2);
        manager.record_focus(7).unwrap();
        manager.set_layout(GridLayout::Trio);
        assert_eq!(manager.focused(), 2);
        assert!(matches!(
            manager.record_focus(3),
            Err(SlotError::NoSuchSlot(3))
        ));
    }

    #[test]
    fn test_inject_targets_focused_slot() {
        let (mut manager, wire, _) = manager(GridLayout::Pair);
        open(&mut manager, 0);
        open(&mut manager, 1);
        manager.record_focus(1).unwrap();

        assert_eq!(manager.inject("/review\r", None).unwrap(), 1);
        assert_eq!(manager.inject("ls\r", Some(0)).unwrap(), 0);
        assert_eq!(
            wire.frames.lock().unwrap().as_slice(),
            &[
                (1, OutboundFrame::Input(b"/review\r".to_vec())),
                (0, OutboundFrame::Input(b"ls\r".to_vec())),
            ]
        );
    }

    #[test]
    fn test_inject_into_idle_slot_fails() {
        let (mut manager, _, _) = manager(GridLayout::Single);
        assert!(matches!(
            manager.inject("x", None),
            Err(SlotError::Session(SessionError::NotOpen))
        ));
    }

    #[test]
    fn test_live_targets_and_currency() {
        let (mut manager, _, _) = manager(GridLayout::Trio);
        open(&mut manager, 0);
        open(&mut manager, 2);
        let targets = manager.live_targets();
        assert_eq!(targets.iter().map(|t| t.0).collect::<Vec<_>>(), vec![0, 2]);

        let (slot, generation) = targets[1];
        assert!(manager.is_current(slot, generation));
        manager.close(2).unwrap();
        assert!(!manager.is_current(slot, generation));

        open(&mut manager, 2);
        assert!(!manager.is_current(slot, generation));
    }
}
