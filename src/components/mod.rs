// ABOUTME: UI components for the dashboard: slot grid, usage bars, changes panel, status line and help

pub mod changes_panel;
pub mod help;
pub mod layout;
pub mod slot_grid;
pub mod status_bar;
pub mod usage_bar;

pub use changes_panel::ChangesPanelComponent;
pub use help::HelpComponent;
pub use layout::LayoutComponent;
pub use slot_grid::SlotGridComponent;
pub use status_bar::StatusBarComponent;
pub use usage_bar::UsageBarComponent;
