// ABOUTME: Bottom status line: input mode, layout, focus, inject prompt and last status message

use crate::app::{state::InputMode, AppState};
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

const GOLD: Color = Color::Rgb(255, 215, 0);
const MUTED_GRAY: Color = Color::Rgb(120, 120, 140);
const DARK_BG: Color = Color::Rgb(25, 25, 35);

pub struct StatusBarComponent;

impl StatusBarComponent {
    pub fn line(state: &AppState) -> Line<'static> {
        let (mode, mode_color) = match &state.mode {
            InputMode::Passthrough => (" TERM ", Color::Rgb(100, 200, 100)),
            InputMode::Command => (" CMD ", GOLD),
            InputMode::Inject { .. } => (" INJECT ", Color::Rgb(186, 120, 230)),
        };

        let mut spans = vec![
            Span::styled(
                mode,
                Style::default()
                    .fg(DARK_BG)
                    .bg(mode_color)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    " layout {} │ slot {}/{} ",
                    state.slots.layout(),
                    state.slots.focused() + 1,
                    state.slots.capacity()
                ),
                Style::default().fg(MUTED_GRAY),
            ),
        ];

        match &state.mode {
            InputMode::Inject { buffer } => {
                spans.push(Span::styled(
                    format!("send to slot {}> ", state.slots.focused() + 1),
                    Style::default().fg(GOLD),
                ));
                spans.push(Span::raw(format!("{}▏", buffer)));
            }
            InputMode::Command => spans.push(Span::styled(
                "c claude  C claude yolo  x codex  s shell  k close  i inject  l layout  d changes  ? help",
                Style::default().fg(GOLD),
            )),
            InputMode::Passthrough => {
                if let Some(message) = &state.status_message {
                    spans.push(Span::styled(
                        message.clone(),
                        Style::default().fg(Color::Rgb(220, 220, 230)),
                    ));
                } else {
                    spans.push(Span::styled(
                        "Ctrl+A ? for help",
                        Style::default().fg(MUTED_GRAY),
                    ));
                }
            }
        }
        Line::from(spans)
    }

    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        frame.render_widget(
            Paragraph::new(Self::line(state)).style(Style::default().bg(DARK_BG)),
            area,
        );
    }
}
