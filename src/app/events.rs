// ABOUTME: Keyboard and mouse handling: prefix-key commands, prompt injection and passthrough

use crate::app::{state::InputMode, AppState};
use crate::models::AgentKind;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    FocusNext,
    FocusPrevious,
    FocusSlot(usize),
    CycleLayout,
    LaunchFocused { agent: AgentKind, yolo: bool },
    CloseFocused,
    ToggleChangesPanel,
    ToggleHelp,
    // Prompt injection
    StartInject,
    InjectChar(char),
    InjectBackspace,
    InjectSubmit,
    InjectCancel,
    /// Key for the focused terminal
    ForwardKey(KeyEvent),
    Paste(String),
    MouseClick { x: u16, y: u16 },
}

pub struct EventHandler;

impl EventHandler {
    /// Whether `key` is the dashboard prefix (Ctrl+A)
    pub fn is_prefix(key: &KeyEvent) -> bool {
        key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('a') | KeyCode::Char('A'))
    }

    pub fn handle_key_event(key_event: KeyEvent, state: &mut AppState) -> Option<AppEvent> {
        if key_event.kind == KeyEventKind::Release {
            return None;
        }

        match state.mode {
            InputMode::Passthrough => {
                if Self::is_prefix(&key_event) {
                    state.mode = InputMode::Command;
                    return None;
                }
                if state.help_visible && key_event.code == KeyCode::Esc {
                    return Some(AppEvent::ToggleHelp);
                }
                Some(AppEvent::ForwardKey(key_event))
            }
            InputMode::Command => {
                // One command per prefix
                state.mode = InputMode::Passthrough;
                Self::handle_command_key(key_event)
            }
            InputMode::Inject { .. } => Self::handle_inject_key(key_event),
        }
    }

    fn handle_command_key(key_event: KeyEvent) -> Option<AppEvent> {
        // A second prefix sends a literal Ctrl+A through
        if Self::is_prefix(&key_event) {
            return Some(AppEvent::ForwardKey(key_event));
        }

        match key_event.code {
            KeyCode::Char('q') => Some(AppEvent::Quit),
            KeyCode::Char(c @ '1'..='8') => {
                c.to_digit(10).map(|d| AppEvent::FocusSlot(d as usize - 1))
            }
            KeyCode::Tab | KeyCode::Char('n') | KeyCode::Right => Some(AppEvent::FocusNext),
            KeyCode::BackTab | KeyCode::Char('p') | KeyCode::Left => Some(AppEvent::FocusPrevious),
            KeyCode::Char('l') => Some(AppEvent::CycleLayout),
            KeyCode::Char('c') => Some(AppEvent::LaunchFocused {
                agent: AgentKind::Claude,
                yolo: false,
            }),
            KeyCode::Char('C') => Some(AppEvent::LaunchFocused {
                agent: AgentKind::Claude,
                yolo: true,
            }),
            KeyCode::Char('x') => Some(AppEvent::LaunchFocused {
                agent: AgentKind::Codex,
                yolo: false,
            }),
            KeyCode::Char('X') => Some(AppEvent::LaunchFocused {
                agent: AgentKind::Codex,
                yolo: true,
            }),
            KeyCode::Char('s') => Some(AppEvent::LaunchFocused {
                agent: AgentKind::None,
                yolo: false,
            }),
            KeyCode::Char('k') => Some(AppEvent::CloseFocused),
            KeyCode::Char('d') => Some(AppEvent::ToggleChangesPanel),
            KeyCode::Char('i') => Some(AppEvent::StartInject),
            KeyCode::Char('?') => Some(AppEvent::ToggleHelp),
            KeyCode::Esc => None,
            other => {
                debug!("Unbound command key {:?}", other);
                None
            }
        }
    }

    fn handle_inject_key(key_event: KeyEvent) -> Option<AppEvent> {
        match key_event.code {
            KeyCode::Esc => Some(AppEvent::InjectCancel),
            KeyCode::Enter => Some(AppEvent::InjectSubmit),
            KeyCode::Backspace => Some(AppEvent::InjectBackspace),
            KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AppEvent::InjectChar(c))
            }
            _ => None,
        }
    }

    /// Pasted text goes to the inject buffer when it is open, otherwise to the
    /// focused terminal
    pub fn handle_paste(text: String, state: &mut AppState) -> Option<AppEvent> {
        if let InputMode::Inject { buffer } = &mut state.mode {
            buffer.push_str(&text.replace(['\r', '\n'], " "));
            return None;
        }
        state.mode = InputMode::Passthrough;
        Some(AppEvent::Paste(text))
    }

    pub fn process_event(event: AppEvent, state: &mut AppState) {
        match event {
            AppEvent::Quit => state.quit(),
            AppEvent::FocusNext => state.focus_next(),
            AppEvent::FocusPrevious => state.focus_previous(),
            AppEvent::FocusSlot(slot) => state.focus_slot(slot),
            AppEvent::CycleLayout => {
                let next = state.slots.layout().next();
                state.set_layout(next);
            }
            AppEvent::LaunchFocused { agent, yolo } => state.launch_focused(agent, yolo),
            AppEvent::CloseFocused => state.close_focused(),
            AppEvent::ToggleChangesPanel => state.toggle_changes_panel(),
            AppEvent::ToggleHelp => state.toggle_help(),
            AppEvent::StartInject => {
                state.mode = InputMode::Inject {
                    buffer: String::new(),
                };
            }
            AppEvent::InjectChar(c) => {
                if let InputMode::Inject { buffer } = &mut state.mode {
                    buffer.push(c);
                }
            }
            AppEvent::InjectBackspace => {
                if let InputMode::Inject { buffer } = &mut state.mode {
                    buffer.pop();
                }
            }
            AppEvent::InjectSubmit => {
                if let InputMode::Inject { buffer } = std::mem::take(&mut state.mode) {
                    if !buffer.is_empty() {
                        state.inject(&buffer);
                    }
                }
            }
            AppEvent::InjectCancel => state.mode = InputMode::Passthrough,
            AppEvent::ForwardKey(key) => {
                if let Err(err) = state.slots.send_key_to_focused(&key) {
                    debug!("Key not delivered: {}", err);
                }
            }
            AppEvent::Paste(text) => {
                if let Err(err) = state.slots.paste_to_focused(&text) {
                    debug!("Paste not delivered: {}", err);
                }
            }
            AppEvent::MouseClick { x, y } => {
                if let Some(slot) = state.slot_at(x, y) {
                    state.focus_slot(slot);
                }
            }
        }
    }
}
