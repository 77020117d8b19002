// ABOUTME: Behavioral tests for container-driven resize frames and the two settle passes

use crate::fixtures::DeckBuilder;
use agentgrid::models::{GridLayout, TerminalGeometry};
use agentgrid::terminal::ContainerSize;

fn geometry(cols: u16, rows: u16) -> TerminalGeometry {
    TerminalGeometry::new(cols, rows).unwrap()
}

#[tokio::test]
async fn test_height_change_resizes_now_and_again_after_settling() {
    let mut deck = DeckBuilder::new(GridLayout::Single).settle_ms(5, 25).build();
    deck.open(0);
    assert!(deck.recorded.resizes(0).is_empty());

    deck.app
        .state
        .slots
        .observe_container(0, ContainerSize::new(100, 30));
    assert_eq!(deck.recorded.resizes(0), vec![geometry(100, 30)]);

    // Short pass finds nothing new; the long pass confirms
    deck.pump(2, 500).await;
    let resizes = deck.recorded.resizes(0);
    assert_eq!(resizes, vec![geometry(100, 30), geometry(100, 30)]);
    assert_eq!(
        deck.app.state.slots.session(0).unwrap().last_sent_geometry(),
        Some(geometry(100, 30))
    );
    assert_eq!(
        deck.app.state.slots.session(0).unwrap().view_geometry(),
        Some(geometry(100, 30))
    );
}

#[tokio::test]
async fn test_final_frame_matches_last_container_size() {
    let mut deck = DeckBuilder::new(GridLayout::Single).settle_ms(5, 25).build();
    deck.open(0);

    deck.app
        .state
        .slots
        .observe_container(0, ContainerSize::new(100, 30));
    deck.app
        .state
        .slots
        .observe_container(0, ContainerSize::new(100, 20));

    deck.pump(2, 500).await;
    let resizes = deck.recorded.resizes(0);
    assert_eq!(resizes.last(), Some(&geometry(100, 20)));
}

#[tokio::test]
async fn test_zero_sized_container_sends_nothing() {
    let mut deck = DeckBuilder::new(GridLayout::Single).settle_ms(5, 25).build();
    deck.open(0);

    deck.app
        .state
        .slots
        .observe_container(0, ContainerSize::new(0, 30));
    deck.pump(2, 100).await;
    assert!(deck.recorded.resizes(0).is_empty());

    // Recovers on the next real size
    deck.app
        .state
        .slots
        .observe_container(0, ContainerSize::new(90, 30));
    assert_eq!(deck.recorded.resizes(0), vec![geometry(90, 30)]);
}

#[test]
fn test_idle_slot_only_records_size() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.app
        .state
        .slots
        .observe_container(0, ContainerSize::new(120, 40));
    assert!(deck.recorded.resizes(0).is_empty());

    // Launch picks up the measured size
    deck.open(0);
    let params = deck.recorded.params.lock().unwrap()[0].clone();
    assert_eq!(params.geometry, geometry(120, 40));
}
