// ABOUTME: Local terminal emulator abstraction and its vt100-backed implementation
//
// The session state machine only talks to `TerminalView`, so any emulator can
// stand in. `Vt100View` keeps a vt100 screen (render buffer + cursor model)
// and paints it into a ratatui buffer.

use crate::models::TerminalGeometry;
use crate::terminal::keys::encode_key;
use crossterm::event::KeyEvent;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};

/// Render buffer and cursor model for one slot
#[cfg_attr(test, mockall::automock)]
pub trait TerminalView: Send {
    /// Feed raw output bytes. Partial escape sequences are buffered internally.
    fn write(&mut self, data: &[u8]);

    /// Translate a user key press into the bytes to send upstream
    fn input(&self, key: &KeyEvent) -> Option<Vec<u8>>;

    /// Bytes for pasted text, bracketed when the application asked for it
    fn paste(&self, text: &str) -> Vec<u8>;

    /// Apply a new grid size. Returns true when the geometry actually changed.
    fn resize(&mut self, geometry: TerminalGeometry) -> bool;

    fn geometry(&self) -> TerminalGeometry;

    /// Release the emulator. Further writes are ignored.
    fn dispose(&mut self);

    fn render(&self, area: Rect, buf: &mut Buffer);
}

/// Creates the view a session gets on launch
pub trait ViewFactory: Send + Sync {
    fn create(&self, geometry: TerminalGeometry) -> Box<dyn TerminalView>;
}

impl<F> ViewFactory for F
where
    F: Fn(TerminalGeometry) -> Box<dyn TerminalView> + Send + Sync,
{
    fn create(&self, geometry: TerminalGeometry) -> Box<dyn TerminalView> {
        self(geometry)
    }
}

/// Factory for vt100-backed views
#[derive(Debug, Clone, Copy)]
pub struct Vt100ViewFactory {
    pub scrollback: usize,
}

impl ViewFactory for Vt100ViewFactory {
    fn create(&self, geometry: TerminalGeometry) -> Box<dyn TerminalView> {
        Box::new(Vt100View::new(geometry, self.scrollback))
    }
}

pub struct Vt100View {
    parser: Option<vt100::Parser>,
    geometry: TerminalGeometry,
}

impl std::fmt::Debug for Vt100View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vt100View")
            .field("geometry", &self.geometry)
            .field("disposed", &self.parser.is_none())
            .finish()
    }
}

impl Vt100View {
    pub fn new(geometry: TerminalGeometry, scrollback: usize) -> Self {
        Self {
            parser: Some(vt100::Parser::new(geometry.rows, geometry.cols, scrollback)),
            geometry,
        }
    }

    /// Visible screen text, one line per row (trailing blanks trimmed)
    pub fn contents(&self) -> String {
        self.parser
            .as_ref()
            .map(|p| p.screen().contents())
            .unwrap_or_default()
    }

    pub fn is_disposed(&self) -> bool {
        self.parser.is_none()
    }
}

impl TerminalView for Vt100View {
    fn write(&mut self, data: &[u8]) {
        if let Some(parser) = self.parser.as_mut() {
            parser.process(data);
        }
    }

    fn input(&self, key: &KeyEvent) -> Option<Vec<u8>> {
        let application_cursor = self
            .parser
            .as_ref()
            .is_some_and(|p| p.screen().application_cursor());
        encode_key(key, application_cursor)
    }

    fn paste(&self, text: &str) -> Vec<u8> {
        let bracketed = self
            .parser
            .as_ref()
            .is_some_and(|p| p.screen().bracketed_paste());
        if bracketed {
            format!("\x1b[200~{}\x1b[201~", text).into_bytes()
        } else {
            text.as_bytes().to_vec()
        }
    }

    fn resize(&mut self, geometry: TerminalGeometry) -> bool {
        if geometry == self.geometry {
            return false;
        }
        self.geometry = geometry;
        if let Some(parser) = self.parser.as_mut() {
            parser.set_size(geometry.rows, geometry.cols);
        }
        true
    }

    fn geometry(&self) -> TerminalGeometry {
        self.geometry
    }

    fn dispose(&mut self) {
        self.parser = None;
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let Some(parser) = self.parser.as_ref() else {
            return;
        };
        let screen = parser.screen();
        let rows = area.height.min(self.geometry.rows);
        let cols = area.width.min(self.geometry.cols);

        for row in 0..rows {
            for col in 0..cols {
                let Some(cell) = screen.cell(row, col) else {
                    continue;
                };
                if cell.is_wide_continuation() {
                    continue;
                }
                let target = buf.get_mut(area.x + col, area.y + row);
                let contents = cell.contents();
                target.set_symbol(if contents.is_empty() { " " } else { contents.as_str() });
                target.set_style(cell_style(cell));
            }
        }

        if !screen.hide_cursor() {
            let (cursor_row, cursor_col) = screen.cursor_position();
            if cursor_row < rows && cursor_col < cols {
                let target = buf.get_mut(area.x + cursor_col, area.y + cursor_row);
                target.set_style(Style::default().add_modifier(Modifier::REVERSED));
            }
        }
    }
}

fn cell_style(cell: &vt100::Cell) -> Style {
    let mut style = Style::default()
        .fg(convert_color(cell.fgcolor()))
        .bg(convert_color(cell.bgcolor()));
    if cell.bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.inverse() {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn convert_color(color: vt100::Color) -> Color {
    match color {
        vt100::Color::Default => Color::Reset,
        vt100::Color::Idx(i) => Color::Indexed(i),
        vt100::Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}
