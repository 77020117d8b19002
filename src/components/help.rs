// ABOUTME: Help overlay listing the prefix-key commands

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem},
};

pub struct HelpComponent;

impl HelpComponent {
    pub fn render(frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 80, area);

        frame.render_widget(Clear, popup_area);

        let heading = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        let help_items = vec![
            ListItem::new("All commands follow the Ctrl+A prefix.").style(heading),
            ListItem::new(""),
            ListItem::new("Slots:").style(heading),
            ListItem::new("  1-8        Focus slot"),
            ListItem::new("  Tab/n/→    Next slot"),
            ListItem::new("  p/←        Previous slot"),
            ListItem::new("  l          Cycle layout"),
            ListItem::new(""),
            ListItem::new("Sessions:").style(heading),
            ListItem::new("  c / C      Launch claude (C: skip permission prompts)"),
            ListItem::new("  x / X      Launch codex (X: bypass approvals)"),
            ListItem::new("  s          Launch a shell"),
            ListItem::new("  k          Close focused session"),
            ListItem::new("  i          Type a prompt for the focused slot"),
            ListItem::new(""),
            ListItem::new("Panels:").style(heading),
            ListItem::new("  d          Toggle changes panel"),
            ListItem::new("  ?          Toggle this help"),
            ListItem::new(""),
            ListItem::new("General:").style(heading),
            ListItem::new("  Ctrl+A     Send a literal Ctrl+A"),
            ListItem::new("  q          Quit"),
        ];

        let help_list = List::new(help_items).block(
            Block::default()
                .title("Help - Esc to close")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );

        frame.render_widget(help_list, popup_area);
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
