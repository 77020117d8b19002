// ABOUTME: Top-level screen layout: slot grid, optional changes panel, status line and help overlay

use super::{ChangesPanelComponent, HelpComponent, SlotGridComponent, StatusBarComponent};
use crate::app::AppState;
use ratatui::prelude::*;

/// Width of the changes panel as a percentage of the screen
const CHANGES_PANEL_PERCENT: u16 = 30;

#[derive(Default)]
pub struct LayoutComponent;

impl LayoutComponent {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&mut self, frame: &mut Frame, state: &mut AppState) {
        let main_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),    // Slots and panel
                Constraint::Length(1), // Status line
            ])
            .split(frame.size());

        let grid_area = if state.changes_panel_open {
            let content = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(100 - CHANGES_PANEL_PERCENT),
                    Constraint::Percentage(CHANGES_PANEL_PERCENT),
                ])
                .split(main_layout[0]);
            let focused = state.slots.focused();
            ChangesPanelComponent::render(frame, content[1], focused, state.changes.get(focused));
            content[0]
        } else {
            main_layout[0]
        };

        SlotGridComponent::render(frame, grid_area, state);
        StatusBarComponent::render(frame, main_layout[1], state);

        if state.help_visible {
            HelpComponent::render(frame, frame.size());
        }
    }
}
