// ABOUTME: Application core: slot ownership, state, event loop plumbing and key handling

pub mod events;
pub mod slot_manager;
pub mod state;

pub use events::{AppEvent, EventHandler};
pub use slot_manager::{SlotError, SlotManager, SlotSettings};
pub use state::{App, AppState, InputMode};
