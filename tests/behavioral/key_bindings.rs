// ABOUTME: Behavioral tests for the prefix key, passthrough typing, paste and inject prompt

use crate::fixtures::DeckBuilder;
use agentgrid::app::{AppEvent, EventHandler, InputMode};
use agentgrid::models::{AgentKind, GridLayout, SessionState};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

const fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn press(deck: &mut crate::fixtures::TestDeck, key_event: KeyEvent) {
    if let Some(event) = EventHandler::handle_key_event(key_event, &mut deck.app.state) {
        EventHandler::process_event(event, &mut deck.app.state);
    }
}

#[test]
fn test_typing_reaches_focused_terminal() {
    let mut deck = DeckBuilder::new(GridLayout::Pair).build();
    deck.open(1);

    press(&mut deck, key(KeyCode::Char('l')));
    press(&mut deck, key(KeyCode::Char('s')));
    press(&mut deck, key(KeyCode::Enter));
    press(&mut deck, ctrl('c'));

    assert_eq!(
        deck.recorded.inputs(1),
        vec![b"l".to_vec(), b"s".to_vec(), b"\r".to_vec(), vec![0x03]]
    );
}

#[test]
fn test_prefix_commands_drive_the_dashboard() {
    let mut deck = DeckBuilder::new(GridLayout::Grid2x2).build();

    press(&mut deck, ctrl('a'));
    press(&mut deck, key(KeyCode::Char('3')));
    assert_eq!(deck.app.state.slots.focused(), 2);

    press(&mut deck, ctrl('a'));
    press(&mut deck, key(KeyCode::Char('C')));
    let session = deck.app.state.slots.session(2).unwrap();
    assert_eq!(session.state(), SessionState::Connecting);
    assert_eq!(session.slot().agent_kind, AgentKind::Claude);
    assert!(session.slot().yolo);

    press(&mut deck, ctrl('a'));
    press(&mut deck, key(KeyCode::Char('l')));
    assert_eq!(deck.app.state.slots.layout(), GridLayout::Grid3x2);

    press(&mut deck, ctrl('a'));
    press(&mut deck, key(KeyCode::Char('q')));
    assert!(deck.app.state.should_quit);
}

#[test]
fn test_double_prefix_sends_ctrl_a() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);

    press(&mut deck, ctrl('a'));
    press(&mut deck, ctrl('a'));
    assert_eq!(deck.recorded.inputs(0), vec![vec![0x01]]);
    assert_eq!(deck.app.state.mode, InputMode::Passthrough);
}

#[test]
fn test_inject_prompt_sends_line() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);

    press(&mut deck, ctrl('a'));
    press(&mut deck, key(KeyCode::Char('i')));
    for c in "run tests".chars() {
        press(&mut deck, key(KeyCode::Char(c)));
    }
    // Nothing leaves until Enter
    assert!(deck.recorded.inputs(0).is_empty());

    press(&mut deck, key(KeyCode::Enter));
    assert_eq!(deck.recorded.inputs(0), vec![b"run tests\r".to_vec()]);
    assert_eq!(deck.app.state.mode, InputMode::Passthrough);
}

#[test]
fn test_paste_goes_to_focused_terminal() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);

    let event = EventHandler::handle_paste("line one\nline two".to_string(), &mut deck.app.state);
    assert_eq!(event, Some(AppEvent::Paste("line one\nline two".to_string())));
    EventHandler::process_event(event.unwrap(), &mut deck.app.state);
    assert_eq!(deck.recorded.inputs(0), vec![b"line one\nline two".to_vec()]);
}

#[test]
fn test_keys_for_idle_slot_are_dropped() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    press(&mut deck, key(KeyCode::Char('x')));
    assert!(deck.recorded.frames.lock().unwrap().is_empty());
}
