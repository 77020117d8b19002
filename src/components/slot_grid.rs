// ABOUTME: Slot grid: splits the screen per layout, feeds pane sizes to sessions and draws them

use super::usage_bar::UsageBarComponent;
use crate::app::AppState;
use crate::models::{GridLayout, SessionState};
use crate::terminal::{ContainerSize, TerminalSession};
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

const FOCUS_BORDER: Color = Color::Rgb(100, 149, 237);
const IDLE_BORDER: Color = Color::Rgb(60, 60, 80);
const YOLO_RED: Color = Color::Rgb(230, 100, 100);
const MUTED_GRAY: Color = Color::Rgb(120, 120, 140);
const SOFT_WHITE: Color = Color::Rgb(220, 220, 230);

pub struct SlotGridComponent;

impl SlotGridComponent {
    /// Pane rectangles for every slot of `layout`, row-major
    pub fn slot_areas(layout: GridLayout, area: Rect) -> Vec<Rect> {
        let (cols, rows) = layout.grid();
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(area);

        row_areas
            .iter()
            .flat_map(|row| {
                Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints(vec![Constraint::Ratio(1, cols as u32); cols])
                    .split(*row)
                    .to_vec()
            })
            .collect()
    }

    /// Split a pane's inner area into the terminal area and the usage row
    fn split_inner(inner: Rect) -> (Rect, Rect) {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);
        (parts[0], parts[1])
    }

    fn title(session: &TerminalSession) -> Line<'static> {
        let slot = session.slot();
        let state = session.state();
        let state_color = match state {
            SessionState::Open => Color::Rgb(100, 200, 100),
            SessionState::Connecting => Color::Rgb(255, 165, 0),
            SessionState::Closed => YOLO_RED,
            SessionState::Idle => MUTED_GRAY,
        };

        let mut spans = vec![
            Span::styled(
                format!(" {} ", slot.number()),
                Style::default().fg(SOFT_WHITE).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ", state.indicator()),
                Style::default().fg(state_color),
            ),
        ];
        if state != SessionState::Idle {
            spans.push(Span::styled(
                format!("{} ", slot.agent_kind),
                Style::default().fg(SOFT_WHITE),
            ));
        }
        spans.push(Span::styled(
            format!("{} ", state.label()),
            Style::default().fg(MUTED_GRAY),
        ));
        if slot.yolo && state != SessionState::Idle {
            spans.push(Span::styled(
                "YOLO ",
                Style::default().fg(YOLO_RED).add_modifier(Modifier::BOLD),
            ));
        }
        if let Some(file) = session.active_file() {
            spans.push(Span::styled(
                format!("· {} ", file),
                Style::default().fg(Color::Rgb(255, 215, 0)),
            ));
        }
        Line::from(spans)
    }

    pub fn render(frame: &mut Frame, area: Rect, state: &mut AppState) {
        let areas = Self::slot_areas(state.slots.layout(), area);

        // Sizes first, so the views are fitted before they are drawn
        for (slot, pane) in areas.iter().enumerate() {
            let inner = Block::default().borders(Borders::ALL).inner(*pane);
            let (terminal_area, _) = Self::split_inner(inner);
            state.slots.observe_container(
                slot,
                ContainerSize::new(terminal_area.width, terminal_area.height),
            );
        }

        let focused = state.slots.focused();
        for (slot, pane) in areas.iter().enumerate() {
            let Some(session) = state.slots.session(slot) else {
                continue;
            };
            let border = if slot == focused {
                FOCUS_BORDER
            } else {
                IDLE_BORDER
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(if slot == focused {
                    BorderType::Thick
                } else {
                    BorderType::Rounded
                })
                .border_style(Style::default().fg(border))
                .title(Self::title(session));
            let inner = block.inner(*pane);
            frame.render_widget(block, *pane);

            let (terminal_area, usage_area) = Self::split_inner(inner);
            if session.state() == SessionState::Idle {
                let hint = Paragraph::new(Line::from(vec![
                    Span::styled("Ctrl+A ", Style::default().fg(Color::Rgb(255, 215, 0))),
                    Span::styled(
                        "then c claude, x codex, s shell",
                        Style::default().fg(MUTED_GRAY),
                    ),
                ]))
                .alignment(Alignment::Center);
                frame.render_widget(hint, terminal_area);
            } else {
                session.render(terminal_area, frame.buffer_mut());
            }
            UsageBarComponent::render(frame, usage_area, &state.usage, slot);
        }

        state.slot_areas = areas;
    }
}
