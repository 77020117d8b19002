// ABOUTME: Keeps a slot's emulator grid and the remote PTY geometry consistent
//
// The adapter turns an observed container size into a character grid and
// decides when a resize frame has to go upstream. Timing (the short and long
// settle passes) is driven by the owning session.

use crate::models::TerminalGeometry;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Container has not been observed yet")]
    NotMounted,

    #[error("Container {width}x{height} is too small for one cell")]
    ZeroSized { width: u16, height: u16 },

    #[error("Cell metrics must be non-zero")]
    InvalidCellMetrics,
}

/// Size of the area a slot's terminal is drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSize {
    pub width: u16,
    pub height: u16,
}

impl ContainerSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Size of one character cell in container units. A TUI container is already
/// measured in cells, so the default is 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub width: u16,
    pub height: u16,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

/// Which fit is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPass {
    /// Directly on observation
    Immediate,
    /// After the short settle delay
    Short,
    /// After the long settle delay; always confirms the geometry upstream
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    pub short: Duration,
    pub long: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            short: Duration::from_millis(50),
            long: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeometryAdapter {
    container: Option<ContainerSize>,
    metrics: CellMetrics,
    last_sent: Option<TerminalGeometry>,
    delays: SettleDelays,
}

impl GeometryAdapter {
    pub fn new(metrics: CellMetrics, delays: SettleDelays) -> Self {
        Self {
            container: None,
            metrics,
            last_sent: None,
            delays,
        }
    }

    /// Store the latest container size. Returns true when it differs from the
    /// previous observation.
    pub fn record(&mut self, size: ContainerSize) -> bool {
        if self.container == Some(size) {
            return false;
        }
        self.container = Some(size);
        true
    }

    pub fn container(&self) -> Option<ContainerSize> {
        self.container
    }

    /// Grid that fits the last observed container
    pub fn fit(&self) -> Result<TerminalGeometry, GeometryError> {
        let container = self.container.ok_or(GeometryError::NotMounted)?;
        if self.metrics.width == 0 || self.metrics.height == 0 {
            return Err(GeometryError::InvalidCellMetrics);
        }
        let cols = container.width / self.metrics.width;
        let rows = container.height / self.metrics.height;
        TerminalGeometry::new(cols, rows).ok_or(GeometryError::ZeroSized {
            width: container.width,
            height: container.height,
        })
    }

    /// Whether `geometry` has to be sent upstream on this pass
    pub fn needs_frame(&self, geometry: TerminalGeometry, pass: FitPass) -> bool {
        match pass {
            FitPass::Long => true,
            FitPass::Immediate | FitPass::Short => self.last_sent != Some(geometry),
        }
    }

    pub fn mark_sent(&mut self, geometry: TerminalGeometry) {
        self.last_sent = Some(geometry);
    }

    pub fn last_sent(&self) -> Option<TerminalGeometry> {
        self.last_sent
    }

    /// Forget what the remote side was told. Used when a new stream starts.
    pub fn reset_remote(&mut self) {
        self.last_sent = None;
    }

    pub fn delays(&self) -> SettleDelays {
        self.delays
    }
}

impl Default for GeometryAdapter {
    fn default() -> Self {
        Self::new(CellMetrics::default(), SettleDelays::default())
    }
}
