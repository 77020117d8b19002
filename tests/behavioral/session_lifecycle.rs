// ABOUTME: Behavioral tests for slot session lifecycle: launch, banners, close, failure, stale events

use crate::fixtures::{DeckBuilder, WORKDIR};
use agentgrid::models::{AgentKind, GridLayout, SessionState};
use agentgrid::terminal::StreamEvent;
use std::path::PathBuf;

#[test]
fn test_launch_open_close_disposes_once() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.app.state.launch_focused(AgentKind::Claude, false);

    let params = deck.recorded.params.lock().unwrap()[0].clone();
    assert_eq!(params.agent, AgentKind::Claude);
    assert!(!params.yolo);
    assert_eq!(params.cwd, PathBuf::from(WORKDIR));
    assert_eq!(
        deck.app.state.slots.session(0).unwrap().state(),
        SessionState::Connecting
    );

    deck.recorded.sink_for(0).opened();
    deck.app.drain_events();
    assert_eq!(
        deck.app.state.slots.session(0).unwrap().state(),
        SessionState::Open
    );
    assert!(deck.views.text().contains("normal mode"));

    deck.app.state.close_focused();
    assert_eq!(deck.views.disposals(), 1);
    assert_eq!(deck.recorded.closes(), 1);

    // Second close is a no-op
    deck.app.state.close_focused();
    assert_eq!(deck.views.disposals(), 1);
    assert_eq!(deck.recorded.closes(), 1);
    assert_eq!(
        deck.app.state.slots.session(0).unwrap().state(),
        SessionState::Closed
    );
}

#[test]
fn test_yolo_banner_names_skipped_prompts() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.app.state.launch_focused(AgentKind::Codex, true);
    deck.recorded.sink_for(0).opened();
    deck.app.drain_events();

    let text = deck.views.text();
    assert!(text.contains("codex session"));
    assert!(text.contains("YOLO mode"));
    assert!(deck.recorded.params.lock().unwrap()[0].yolo);
}

#[test]
fn test_connection_failure_shows_banner_without_retry() {
    let mut deck = DeckBuilder::new(GridLayout::Single)
        .refuse_connections("server unreachable")
        .build();
    deck.app.state.launch_focused(AgentKind::Claude, false);
    deck.app.drain_events();

    let session = deck.app.state.slots.session(0).unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert!(deck.views.text().contains("connection failed"));
    assert!(deck.views.text().contains("server unreachable"));
    assert_eq!(deck.recorded.opens(), 1);
    assert!(deck.app.state.status_message.is_some());
}

#[test]
fn test_remote_close_keeps_output_visible() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);
    deck.recorded.sink_for(0).closed(Some("exit status 0".to_string()));
    deck.app.drain_events();

    assert_eq!(
        deck.app.state.slots.session(0).unwrap().state(),
        SessionState::Closed
    );
    assert!(deck.views.text().contains("[session closed: exit status 0]"));
    assert_eq!(deck.views.disposals(), 0);
    assert_eq!(deck.recorded.closes(), 1);
}

#[test]
fn test_events_from_previous_launch_are_dropped() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);
    let old_sink = deck.recorded.sink_for(0);

    deck.app.state.close_focused();
    deck.open(0);
    let before = deck.views.text().len();

    old_sink.data(b"stale output from src/old.rs\r\n".to_vec());
    old_sink.closed(None);
    deck.app.drain_events();

    let session = deck.app.state.slots.session(0).unwrap();
    assert_eq!(session.state(), SessionState::Open);
    assert_eq!(session.active_file(), None);
    assert_eq!(deck.views.text().len(), before);
}

#[test]
fn test_output_sets_active_file() {
    let mut deck = DeckBuilder::new(GridLayout::Pair).build();
    deck.open(1);
    let sink = deck.recorded.sink_for(1);

    sink.data(b"\x1b[1mReading\x1b[0m a.py\r\n".to_vec());
    sink.data(b"\x1b]0;title\x07Editing src/components/c.ts now\r\n".to_vec());
    deck.app.drain_events();

    assert_eq!(
        deck.app.state.slots.session(1).unwrap().active_file(),
        Some("src/components/c.ts")
    );
    assert_eq!(deck.app.state.slots.session(0).unwrap().active_file(), None);
}

#[test]
fn test_inject_goes_to_focused_open_slot() {
    let mut deck = DeckBuilder::new(GridLayout::Grid2x2).build();
    deck.open(0);
    deck.open(2);

    deck.app.state.focus_slot(2);
    deck.app.state.inject("/review the diff");
    assert_eq!(deck.recorded.inputs(2), vec![b"/review the diff\r".to_vec()]);
    assert!(deck.recorded.inputs(0).is_empty());

    // Idle slot: nothing sent, user told why
    deck.app.state.focus_slot(1);
    deck.app.state.inject("hello");
    assert!(deck.recorded.inputs(1).is_empty());
    assert!(deck
        .app
        .state
        .status_message
        .as_deref()
        .is_some_and(|m| m.contains("Slot 2")));
}

#[test]
fn test_stream_event_variants_after_close_are_ignored() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    let generation = deck.open(0);
    deck.app.state.close_focused();

    let events = deck.app.events();
    events
        .send(agentgrid::events::DeckEvent::Stream {
            slot: 0,
            generation,
            event: StreamEvent::Data(b"late".to_vec()),
        })
        .unwrap();
    deck.app.drain_events();
    assert!(!deck.views.text().contains("late"));
}
