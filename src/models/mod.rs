// ABOUTME: Core data models for slots, layouts, change tracking, and usage snapshots

pub mod change;
pub mod layout;
pub mod slot;
pub mod usage;

pub use change::{ChangeEntry, DiffStats, FsChange, FsEventKind};
pub use layout::GridLayout;
pub use slot::{AgentKind, SessionState, Slot, TerminalGeometry};
pub use usage::UsageSample;
