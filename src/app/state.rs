// ABOUTME: Application state and the single owner loop that applies background events
//
// `AppState` holds every piece of mutable state. Background work (streams,
// timers, diff fetches, usage polls, change feeds) reports back through
// `DeckEvent`s drained by `App::drain_events`, so nothing else ever touches
// sessions or correlators.

use crate::app::slot_manager::{SlotError, SlotManager, SlotSettings};
use crate::changes::{
    spawn_remote_feed, ChangeCorrelator, DiffRequest, DiffSource, DiffTicket, GitDiffSource,
    HttpDiffSource, LocalChangeWatcher,
};
use crate::config::{AppConfig, TransportMode};
use crate::events::DeckEvent;
use crate::models::{AgentKind, FsChange, GridLayout};
use crate::terminal::{
    LocalPtyConnector, SessionBackends, StreamConnector, Vt100ViewFactory, WsStreamConnector,
};
use crate::usage::{ContextUsageTracker, HttpUsageSource, UsageSource};
use anyhow::{Context, Result};
use ratatui::layout::Rect;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What keystrokes currently mean
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Keys go to the focused slot
    #[default]
    Passthrough,
    /// Prefix key seen; the next key is a dashboard command
    Command,
    /// Typing a line to inject into the focused slot
    Inject { buffer: String },
}

pub struct AppState {
    pub config: AppConfig,
    pub slots: SlotManager,
    /// One correlator per slot, indexed by slot id
    pub changes: Vec<ChangeCorrelator>,
    pub usage: ContextUsageTracker,
    pub usage_available: bool,
    pub mode: InputMode,
    pub changes_panel_open: bool,
    pub help_visible: bool,
    pub status_message: Option<String>,
    pub should_quit: bool,
    /// Screen areas of the slot panes from the last draw, by slot id
    pub slot_areas: Vec<Rect>,
    diff_source: Arc<dyn DiffSource>,
    usage_source: Option<Arc<dyn UsageSource>>,
    events: mpsc::UnboundedSender<DeckEvent>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("slots", &self.slots)
            .field("mode", &self.mode)
            .field("changes_panel_open", &self.changes_panel_open)
            .field("should_quit", &self.should_quit)
            .finish()
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        backends: SessionBackends,
        diff_source: Arc<dyn DiffSource>,
        usage_source: Option<Arc<dyn UsageSource>>,
        events: mpsc::UnboundedSender<DeckEvent>,
    ) -> Self {
        // Watcher paths are canonical, so slot directories must be too
        let working_directory = config.workspace.resolved_working_directory();
        let working_directory = working_directory.canonicalize().unwrap_or(working_directory);
        let mut settings = SlotSettings::new(working_directory);
        settings.settle = config.terminal.settle_delays();
        settings.fallback_geometry = config.terminal.default_geometry();

        let layout = config.ui.default_layout;
        let slots = SlotManager::new(layout, settings, backends, events.clone());
        let changes = (0..layout.capacity())
            .map(|_| ChangeCorrelator::new(config.changes.capacity))
            .collect();
        let usage = ContextUsageTracker::new(config.usage.windows(), config.usage.bar_cells);

        Self {
            changes_panel_open: config.ui.changes_panel_open,
            usage_available: usage_source.is_some(),
            config,
            slots,
            changes,
            usage,
            mode: InputMode::default(),
            help_visible: false,
            status_message: None,
            should_quit: false,
            slot_areas: Vec::new(),
            diff_source,
            usage_source,
            events,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn toggle_help(&mut self) {
        self.help_visible = !self.help_visible;
    }

    pub fn toggle_changes_panel(&mut self) {
        self.changes_panel_open = !self.changes_panel_open;
    }

    /// Slot whose pane contains the screen cell `(x, y)`
    pub fn slot_at(&self, x: u16, y: u16) -> Option<usize> {
        self.slot_areas.iter().position(|area| {
            x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
        })
    }

    pub fn set_layout(&mut self, layout: GridLayout) {
        self.slots.set_layout(layout);
        let capacity = self.config.changes.capacity;
        self.changes
            .resize_with(layout.capacity(), || ChangeCorrelator::new(capacity));
        self.usage.retain_live(|slot, generation| self.slots.is_current(slot, generation));
        self.set_status(format!("Layout {}", layout));
    }

    pub fn focus_next(&mut self) {
        let next = (self.slots.focused() + 1) % self.slots.capacity().max(1);
        self.focus_slot(next);
    }

    pub fn focus_previous(&mut self) {
        let capacity = self.slots.capacity().max(1);
        let previous = (self.slots.focused() + capacity - 1) % capacity;
        self.focus_slot(previous);
    }

    pub fn focus_slot(&mut self, slot: usize) {
        if let Err(err) = self.slots.record_focus(slot) {
            self.set_status(err.to_string());
        }
    }

    pub fn launch_focused(&mut self, agent: AgentKind, yolo: bool) {
        let slot = self.slots.focused();
        match self.slots.launch(slot, agent, yolo) {
            Ok(_) => {
                if let Some(correlator) = self.changes.get_mut(slot) {
                    correlator.clear();
                }
                self.usage.forget(slot);
                self.set_status(format!("Slot {}: launching {}", slot + 1, agent));
            }
            Err(err) => {
                warn!("Launch in slot {} failed: {}", slot + 1, err);
                self.set_status(format!("Slot {}: {}", slot + 1, err));
            }
        }
    }

    pub fn close_focused(&mut self) {
        let slot = self.slots.focused();
        if let Err(err) = self.slots.close(slot) {
            self.set_status(err.to_string());
            return;
        }
        self.usage.forget(slot);
        self.set_status(format!("Slot {} closed", slot + 1));
    }

    /// Send a line to the focused slot
    pub fn inject(&mut self, text: &str) {
        let line = format!("{}\r", text);
        match self.slots.inject(&line, None) {
            Ok(slot) => self.set_status(format!("Sent to slot {}", slot + 1)),
            Err(SlotError::Session(err)) => {
                self.set_status(format!("Slot {}: {}", self.slots.focused() + 1, err))
            }
            Err(err) => self.set_status(err.to_string()),
        }
    }

    /// Apply one background event
    pub fn handle_deck_event(&mut self, event: DeckEvent) {
        match event {
            DeckEvent::Stream {
                slot,
                generation,
                event,
            } => {
                if let Some(path) = self.slots.handle_stream(slot, generation, event) {
                    debug!("Slot {} active file: {}", slot + 1, path);
                }
            }
            DeckEvent::FitSettle {
                slot,
                generation,
                pass,
            } => self.slots.handle_settle(slot, generation, pass),
            DeckEvent::FsChange(change) => self.route_change(change),
            DeckEvent::DiffFetched {
                slot,
                generation,
                ticket,
                result,
            } => {
                if !self.slots.is_current(slot, generation) {
                    debug!("Discarding diff for {} (slot {} superseded)", ticket.path, slot + 1);
                    return;
                }
                if let Some(correlator) = self.changes.get_mut(slot) {
                    correlator.apply_diff_result(&ticket, result);
                }
            }
            DeckEvent::UsageTick => self.request_usage(),
            DeckEvent::UsagePolled { targets, result } => match result {
                Ok(samples) => {
                    let applied = self.usage.apply_poll(&targets, samples, |slot, generation| {
                        self.slots.is_current(slot, generation)
                    });
                    self.usage
                        .retain_live(|slot, generation| self.slots.is_current(slot, generation));
                    debug!("Applied {} usage samples", applied);
                }
                Err(err) => debug!("Usage poll failed: {}", err),
            },
        }
    }

    /// Hand a change to every live slot whose working directory holds it.
    /// Relative paths go to all live slots.
    fn route_change(&mut self, change: FsChange) {
        let relative = !Path::new(&change.path).is_absolute();
        let targets: Vec<(usize, u64, std::path::PathBuf)> = self
            .slots
            .sessions()
            .filter(|s| s.is_live())
            .filter(|s| relative || Path::new(&change.path).starts_with(&s.slot().working_directory))
            .map(|s| (s.slot().id, s.generation(), s.slot().working_directory.clone()))
            .collect();

        for (slot, generation, root) in targets {
            let Some(correlator) = self.changes.get_mut(slot) else {
                continue;
            };
            if let Some(ticket) = correlator.on_change_event(change.clone()) {
                self.spawn_diff(slot, generation, ticket, root);
            }
        }
    }

    fn spawn_diff(
        &self,
        slot: usize,
        generation: u64,
        ticket: DiffTicket,
        repo_root: std::path::PathBuf,
    ) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime for diff fetch of {}", ticket.path);
            return;
        };
        let fetch = self.diff_source.fetch(DiffRequest {
            repo_root,
            path: ticket.path.clone(),
        });
        let events = self.events.clone();
        runtime.spawn(async move {
            let result = fetch.await;
            let _ = events.send(DeckEvent::DiffFetched {
                slot,
                generation,
                ticket,
                result,
            });
        });
    }

    fn request_usage(&self) {
        let Some(source) = self.usage_source.as_ref() else {
            return;
        };
        let targets = self.slots.live_targets();
        if targets.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let poll = source.poll();
        let events = self.events.clone();
        runtime.spawn(async move {
            let result = poll.await;
            let _ = events.send(DeckEvent::UsagePolled { targets, result });
        });
    }
}

/// Owns the state, the event queue and the background feeds
pub struct App {
    pub state: AppState,
    events_rx: mpsc::UnboundedReceiver<DeckEvent>,
    events_tx: mpsc::UnboundedSender<DeckEvent>,
    background: Vec<JoinHandle<()>>,
    watcher: Option<LocalChangeWatcher>,
}

impl App {
    /// Wire backends for the configured transport
    pub fn new(config: AppConfig) -> Result<Self> {
        let views = Arc::new(Vt100ViewFactory {
            scrollback: config.terminal.scrollback,
        });
        let timeout = config.transport.request_timeout();

        let (connector, diff_source, usage_source): (
            Arc<dyn StreamConnector>,
            Arc<dyn DiffSource>,
            Option<Arc<dyn UsageSource>>,
        ) = match config.transport.mode {
            TransportMode::Local => (
                Arc::new(LocalPtyConnector::new(config.agents.clone())),
                Arc::new(GitDiffSource),
                None,
            ),
            TransportMode::Remote => {
                let server = config.transport.server_url.as_str();
                let connector = WsStreamConnector::new(server)
                    .with_context(|| format!("Invalid server URL '{}'", server))?;
                let diff = HttpDiffSource::new(server, timeout)
                    .context("Failed to create diff client")?;
                let usage: Option<Arc<dyn UsageSource>> = if config.usage.enabled {
                    Some(Arc::new(
                        HttpUsageSource::new(server, timeout)
                            .context("Failed to create usage client")?,
                    ))
                } else {
                    None
                };
                (Arc::new(connector), Arc::new(diff), usage)
            }
        };

        Ok(Self::with_parts(
            config,
            SessionBackends::new(connector, views),
            diff_source,
            usage_source,
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        backends: SessionBackends,
        diff_source: Arc<dyn DiffSource>,
        usage_source: Option<Arc<dyn UsageSource>>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = AppState::new(
            config,
            backends,
            diff_source,
            usage_source,
            events_tx.clone(),
        );
        Self {
            state,
            events_rx,
            events_tx,
            background: Vec::new(),
            watcher: None,
        }
    }

    /// Sender for posting events into the app queue
    pub fn events(&self) -> mpsc::UnboundedSender<DeckEvent> {
        self.events_tx.clone()
    }

    /// Start the change feed and the usage ticker. Feed failures only
    /// degrade the changes panel.
    pub fn start(&mut self) {
        let config = &self.state.config;
        match config.transport.mode {
            TransportMode::Local => {
                let root = config.workspace.resolved_repo_root();
                let root = root.canonicalize().unwrap_or(root);
                match LocalChangeWatcher::start(
                    &root,
                    config.changes.ignore.clone(),
                    self.events_tx.clone(),
                ) {
                    Ok(watcher) => self.watcher = Some(watcher),
                    Err(err) => warn!("File watcher unavailable for {}: {}", root.display(), err),
                }
            }
            TransportMode::Remote => {
                match spawn_remote_feed(&config.transport.server_url, self.events_tx.clone()) {
                    Ok(handle) => self.background.push(handle),
                    Err(err) => warn!("Change feed unavailable: {}", err),
                }
            }
        }

        if self.state.usage_available {
            let interval = config.usage.poll_interval();
            let events = self.events_tx.clone();
            self.background.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    if events.send(DeckEvent::UsageTick).is_err() {
                        break;
                    }
                }
            }));
        }
        info!("Background feeds started");
    }

    /// Apply every queued event. Returns how many were applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.state.handle_deck_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next event and apply it, plus anything queued behind it
    pub async fn next_events(&mut self) -> usize {
        match self.events_rx.recv().await {
            Some(event) => {
                self.state.handle_deck_event(event);
                1 + self.drain_events()
            }
            None => 0,
        }
    }

    pub fn shutdown(&mut self) {
        for handle in self.background.drain(..) {
            handle.abort();
        }
        self.watcher = None;
        self.state.slots.close_all();
        info!("Shut down");
    }
}

impl Drop for App {
    fn drop(&mut self) {
        for handle in self.background.drain(..) {
            handle.abort();
        }
    }
}
