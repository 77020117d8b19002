// ABOUTME: One-line stacked context usage bar drawn under each slot

use crate::usage::{ContextUsageTracker, UsageCategory};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

const NO_DATA: &str = "no usage data";

pub fn category_color(category: UsageCategory) -> Color {
    match category {
        UsageCategory::CacheRead => Color::Rgb(100, 149, 237),
        UsageCategory::CacheWrite => Color::Rgb(186, 120, 230),
        UsageCategory::Input => Color::Rgb(255, 215, 0),
        UsageCategory::Free => Color::Rgb(60, 60, 80),
    }
}

pub struct UsageBarComponent;

impl UsageBarComponent {
    /// Bar of `width` columns for `slot`. The tracker's cells are stretched or
    /// squeezed onto the available columns and the context percentage follows.
    pub fn line(tracker: &ContextUsageTracker, slot: usize, width: u16) -> Line<'static> {
        let (Some(cells), Some(breakdown)) = (tracker.bar(slot), tracker.breakdown(slot)) else {
            return Line::from(Span::styled(
                NO_DATA,
                Style::default().fg(Color::Rgb(120, 120, 140)),
            ));
        };

        let label = format!(" {:>3}%", breakdown.ctx_pct);
        let bar_width = (width as usize).saturating_sub(label.len());
        if bar_width == 0 || cells.is_empty() {
            return Line::from(label);
        }

        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run: Option<(UsageCategory, usize)> = None;
        for column in 0..bar_width {
            let category = cells[column * cells.len() / bar_width];
            match run.as_mut() {
                Some((current, count)) if *current == category => *count += 1,
                _ => {
                    if let Some((current, count)) = run.take() {
                        spans.push(Self::band(current, count));
                    }
                    run = Some((category, 1));
                }
            }
        }
        if let Some((current, count)) = run {
            spans.push(Self::band(current, count));
        }
        spans.push(Span::raw(label));
        Line::from(spans)
    }

    fn band(category: UsageCategory, count: usize) -> Span<'static> {
        let glyph = if category == UsageCategory::Free { "░" } else { "█" };
        Span::styled(
            glyph.repeat(count),
            Style::default().fg(category_color(category)),
        )
    }

    pub fn render(frame: &mut Frame, area: Rect, tracker: &ContextUsageTracker, slot: usize) {
        let line = Self::line(tracker, slot, area.width);
        frame.render_widget(Paragraph::new(line), area);
    }
}
