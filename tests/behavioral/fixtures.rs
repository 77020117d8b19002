// ABOUTME: Shared fakes for behavioral tests
//
// Provides:
// - RecordingConnector: stream connector that records params, frames and closes
// - ViewLog / recording views: terminal views that record writes and disposals
// - StubDiffSource / StubUsageSource: canned service responses
// - TestDeck: an App wired to the fakes

use agentgrid::app::App;
use agentgrid::config::AppConfig;
use agentgrid::error::ServiceError;
use agentgrid::models::{GridLayout, TerminalGeometry, UsageSample};
use agentgrid::terminal::{
    OutboundFrame, SessionBackends, StreamConnection, StreamConnector, StreamError, StreamParams,
    StreamSink, TerminalView,
};
use agentgrid::changes::{DiffRequest, DiffSource};
use agentgrid::usage::UsageSource;
use crossterm::event::KeyEvent;
use futures_util::future::BoxFuture;
use ratatui::{buffer::Buffer, layout::Rect};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WORKDIR: &str = "/work";

/// Everything the fake connector saw
#[derive(Default)]
pub struct Recorded {
    pub params: Mutex<Vec<StreamParams>>,
    pub sinks: Mutex<Vec<StreamSink>>,
    pub frames: Mutex<Vec<(usize, OutboundFrame)>>,
    pub closes: AtomicUsize,
}

impl Recorded {
    pub fn opens(&self) -> usize {
        self.params.lock().unwrap().len()
    }

    /// Sink handed out by the most recent open of `slot`
    pub fn sink_for(&self, slot: usize) -> StreamSink {
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.slot() == slot)
            .cloned()
            .expect("slot was never opened")
    }

    pub fn resizes(&self, slot: usize) -> Vec<TerminalGeometry> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == slot)
            .filter_map(|(_, frame)| match frame {
                OutboundFrame::Resize(geometry) => Some(*geometry),
                OutboundFrame::Input(_) => None,
            })
            .collect()
    }

    pub fn inputs(&self, slot: usize) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == slot)
            .filter_map(|(_, frame)| match frame {
                OutboundFrame::Input(bytes) => Some(bytes.clone()),
                OutboundFrame::Resize(_) => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct RecordingConnector {
    pub recorded: Arc<Recorded>,
    /// Refuse every open with this message
    pub refuse: Option<String>,
}

struct RecordingConnection {
    slot: usize,
    recorded: Arc<Recorded>,
}

impl StreamConnection for RecordingConnection {
    fn send(&mut self, frame: OutboundFrame) -> Result<(), StreamError> {
        self.recorded.frames.lock().unwrap().push((self.slot, frame));
        Ok(())
    }

    fn close(&mut self) {
        self.recorded.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl StreamConnector for RecordingConnector {
    fn open(
        &self,
        params: StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn StreamConnection>, StreamError> {
        self.recorded.params.lock().unwrap().push(params);
        if let Some(message) = &self.refuse {
            return Err(StreamError::InvalidEndpoint(message.clone()));
        }
        let slot = sink.slot();
        self.recorded.sinks.lock().unwrap().push(sink);
        Ok(Box::new(RecordingConnection {
            slot,
            recorded: self.recorded.clone(),
        }))
    }
}

/// What every view created by the test factory saw
#[derive(Default)]
pub struct ViewLog {
    pub written: Mutex<Vec<u8>>,
    pub resizes: Mutex<Vec<TerminalGeometry>>,
    pub disposals: AtomicUsize,
}

impl ViewLog {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.written.lock().unwrap()).into_owned()
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

struct RecordingView {
    log: Arc<ViewLog>,
    geometry: TerminalGeometry,
    disposed: bool,
}

impl TerminalView for RecordingView {
    fn write(&mut self, data: &[u8]) {
        if !self.disposed {
            self.log.written.lock().unwrap().extend_from_slice(data);
        }
    }

    fn input(&self, key: &KeyEvent) -> Option<Vec<u8>> {
        agentgrid::terminal::keys::encode_key(key, false)
    }

    fn paste(&self, text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }

    fn resize(&mut self, geometry: TerminalGeometry) -> bool {
        if geometry == self.geometry {
            return false;
        }
        self.geometry = geometry;
        self.log.resizes.lock().unwrap().push(geometry);
        true
    }

    fn geometry(&self) -> TerminalGeometry {
        self.geometry
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.log.disposals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn render(&self, _area: Rect, _buf: &mut Buffer) {}
}

/// Diff text per path; unknown paths fail
#[derive(Default)]
pub struct StubDiffSource {
    pub diffs: HashMap<String, String>,
}

impl DiffSource for StubDiffSource {
    fn fetch(&self, request: DiffRequest) -> BoxFuture<'static, Result<String, ServiceError>> {
        let result = self
            .diffs
            .get(&request.path)
            .cloned()
            .ok_or_else(|| ServiceError::Malformed(format!("no diff for {}", request.path)));
        Box::pin(async move { result })
    }
}

#[derive(Default)]
pub struct StubUsageSource {
    pub samples: Mutex<Vec<UsageSample>>,
}

impl UsageSource for StubUsageSource {
    fn poll(&self) -> BoxFuture<'static, Result<Vec<UsageSample>, ServiceError>> {
        let samples = self.samples.lock().unwrap().clone();
        Box::pin(async move { Ok(samples) })
    }
}

pub fn sample(model: &str, input: u64, cache_read: u64, cache_write: u64) -> UsageSample {
    UsageSample {
        model_id: model.to_string(),
        input_tokens: input,
        cache_read_tokens: cache_read,
        cache_write_tokens: cache_write,
        ..Default::default()
    }
}

/// An App wired to recording fakes
pub struct TestDeck {
    pub app: App,
    pub recorded: Arc<Recorded>,
    pub views: Arc<ViewLog>,
    pub usage: Arc<StubUsageSource>,
}

pub struct DeckBuilder {
    config: AppConfig,
    refuse: Option<String>,
    diffs: HashMap<String, String>,
    usage: bool,
}

impl DeckBuilder {
    pub fn new(layout: GridLayout) -> Self {
        let mut config = AppConfig::default();
        config.ui.default_layout = layout;
        config.workspace.working_directory = Some(PathBuf::from(WORKDIR));
        Self {
            config,
            refuse: None,
            diffs: HashMap::new(),
            usage: false,
        }
    }

    pub fn settle_ms(mut self, short: u64, long: u64) -> Self {
        self.config.terminal.settle_short_ms = short;
        self.config.terminal.settle_long_ms = long;
        self
    }

    pub fn refuse_connections(mut self, message: &str) -> Self {
        self.refuse = Some(message.to_string());
        self
    }

    pub fn diff(mut self, path: &str, diff: &str) -> Self {
        self.diffs.insert(path.to_string(), diff.to_string());
        self
    }

    pub fn with_usage(mut self) -> Self {
        self.usage = true;
        self
    }

    pub fn build(self) -> TestDeck {
        let recorded = Arc::new(Recorded::default());
        let views = Arc::new(ViewLog::default());
        let usage = Arc::new(StubUsageSource::default());

        let connector = Arc::new(RecordingConnector {
            recorded: recorded.clone(),
            refuse: self.refuse,
        });
        let log = views.clone();
        let factory = move |geometry: TerminalGeometry| -> Box<dyn TerminalView> {
            Box::new(RecordingView {
                log: log.clone(),
                geometry,
                disposed: false,
            })
        };
        let usage_source: Option<Arc<dyn UsageSource>> = if self.usage {
            Some(usage.clone() as Arc<dyn UsageSource>)
        } else {
            None
        };

        let app = App::with_parts(
            self.config,
            SessionBackends::new(connector, Arc::new(factory)),
            Arc::new(StubDiffSource { diffs: self.diffs }),
            usage_source,
        );
        TestDeck {
            app,
            recorded,
            views,
            usage,
        }
    }
}

impl TestDeck {
    /// Launch in `slot` and deliver the open event
    pub fn open(&mut self, slot: usize) -> u64 {
        self.app.state.slots.record_focus(slot).unwrap();
        self.app
            .state
            .launch_focused(agentgrid::models::AgentKind::Claude, false);
        self.recorded.sink_for(slot).opened();
        self.app.drain_events();
        self.app.state.slots.generation_of(slot).unwrap()
    }

    /// Apply queued events, waiting up to `ms` for `count` more to arrive
    pub async fn pump(&mut self, count: usize, ms: u64) {
        let mut seen = 0;
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(ms);
        while seen < count {
            match tokio::time::timeout_at(deadline, self.app.next_events()).await {
                Ok(applied) => seen += applied,
                Err(_) => break,
            }
        }
    }
}
