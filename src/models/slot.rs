// ABOUTME: Slot data model: one addressable terminal unit in the layout grid

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which coding agent a slot runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Plain shell, no agent
    #[default]
    None,
    Claude,
    Codex,
}

impl AgentKind {
    /// Wire name used in stream endpoint query parameters
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::None => "shell",
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a slot's terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Open,
    /// Terminal. Only an explicit relaunch leaves this state.
    Closed,
}

impl SessionState {
    pub fn indicator(&self) -> &'static str {
        match self {
            SessionState::Idle => "○",
            SessionState::Connecting => "◌",
            SessionState::Open => "●",
            SessionState::Closed => "✗",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closed => "closed",
        }
    }

    /// Whether `launch` is accepted from this state
    pub fn can_launch(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Closed)
    }
}

/// Character-grid size of a terminal. Both dimensions are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalGeometry {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalGeometry {
    /// Returns `None` when either dimension is zero
    pub fn new(cols: u16, rows: u16) -> Option<Self> {
        (cols > 0 && rows > 0).then_some(Self { cols, rows })
    }
}

impl Default for TerminalGeometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl fmt::Display for TerminalGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// One slot in the layout grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: usize,
    /// Capacity of the layout this slot was created under
    pub layout_capacity: usize,
    pub agent_kind: AgentKind,
    pub working_directory: PathBuf,
    pub yolo: bool,
}

impl Slot {
    pub fn new(id: usize, layout_capacity: usize, working_directory: PathBuf) -> Self {
        Self {
            id,
            layout_capacity,
            agent_kind: AgentKind::None,
            working_directory,
            yolo: false,
        }
    }

    /// Human-facing slot number (1-based)
    pub fn number(&self) -> usize {
        self.id + 1
    }
}
