// ABOUTME: Side panel listing the focused slot's recent file changes with diff stats

use crate::changes::ChangeCorrelator;
use crate::models::{ChangeEntry, FsEventKind};
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

pub struct ChangesPanelComponent;

impl ChangesPanelComponent {
    fn event_color(kind: FsEventKind) -> Color {
        match kind {
            FsEventKind::Created => Color::Rgb(100, 200, 100),
            FsEventKind::Modified => Color::Rgb(255, 165, 0),
            FsEventKind::Deleted => Color::Rgb(230, 100, 100),
        }
    }

    pub fn entry_line(entry: &ChangeEntry) -> Line<'static> {
        let mut spans = vec![
            Span::styled(
                format!("{} ", entry.event.symbol()),
                Style::default()
                    .fg(Self::event_color(entry.event))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                entry.path.clone(),
                Style::default().fg(Color::Rgb(220, 220, 230)),
            ),
        ];
        let stats = entry.format_stats();
        if !stats.is_empty() {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                stats,
                Style::default().fg(Color::Rgb(100, 149, 237)),
            ));
        }
        spans.push(Span::styled(
            format!(
                " {}",
                entry
                    .observed_at
                    .with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
            ),
            Style::default().fg(Color::Rgb(120, 120, 140)),
        ));
        Line::from(spans)
    }

    pub fn render(frame: &mut Frame, area: Rect, slot: usize, changes: Option<&ChangeCorrelator>) {
        let block = Block::default()
            .title(format!(" Changes · slot {} ", slot + 1))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(60, 60, 80)));

        let entries = changes.map(|c| c.recent_changes()).unwrap_or_default();
        if entries.is_empty() {
            let empty = Paragraph::new("No changes yet")
                .style(Style::default().fg(Color::Rgb(120, 120, 140)))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = entries
            .iter()
            .map(|entry| ListItem::new(Self::entry_line(entry)))
            .collect();
        frame.render_widget(List::new(items).block(block), area);
    }
}
