// ABOUTME: Behavioral tests for usage polling: positional matching, stale results, bar invariants

use crate::fixtures::{sample, DeckBuilder};
use agentgrid::events::DeckEvent;
use agentgrid::models::GridLayout;
use agentgrid::usage::UsageCategory;

#[tokio::test]
async fn test_poll_results_match_live_slots_in_order() {
    let mut deck = DeckBuilder::new(GridLayout::Trio).with_usage().build();
    deck.open(0);
    deck.open(2);
    *deck.usage.samples.lock().unwrap() = vec![
        sample("claude-sonnet-4", 100_000, 60_000, 10_000),
        sample("claude-sonnet-4[1m]", 250_000, 0, 0),
    ];

    deck.app.events().send(DeckEvent::UsageTick).unwrap();
    deck.app.drain_events();
    deck.pump(1, 500).await;

    let usage = &deck.app.state.usage;
    let first = usage.breakdown(0).unwrap();
    assert_eq!(first.ctx_pct, 50);
    assert_eq!(first.cache_read_pct, 30);
    assert_eq!(first.cache_write_pct, 5);
    assert_eq!(first.input_pct, 15);
    assert_eq!(first.free_pct, 50);

    // Large-window model: 250k of 1M
    assert_eq!(usage.breakdown(2).unwrap().ctx_pct, 25);
    assert!(usage.breakdown(1).is_none());
}

#[tokio::test]
async fn test_percentages_always_add_up() {
    let mut deck = DeckBuilder::new(GridLayout::Single).with_usage().build();
    deck.open(0);

    for (input, read, write) in [
        (1, 1, 1),
        (199_999, 150_000, 60_000),
        (450_000, 10, 10),
        (33_333, 11_111, 11_111),
    ] {
        *deck.usage.samples.lock().unwrap() = vec![sample("claude-opus", input, read, write)];
        deck.app.events().send(DeckEvent::UsageTick).unwrap();
        deck.app.drain_events();
        deck.pump(1, 500).await;

        let b = deck.app.state.usage.breakdown(0).unwrap();
        assert_eq!(
            b.cache_read_pct as u32 + b.cache_write_pct as u32 + b.input_pct as u32,
            b.ctx_pct as u32
        );
        assert_eq!(b.ctx_pct as u32 + b.free_pct as u32, 100);

        let bar = deck.app.state.usage.bar(0).unwrap();
        assert_eq!(bar.len(), deck.app.state.usage.cells());
        let free = bar.iter().filter(|c| **c == UsageCategory::Free).count();
        assert_eq!(free, b.free_pct as usize);
    }
}

#[tokio::test]
async fn test_result_for_slot_closed_mid_poll_is_dropped() {
    let mut deck = DeckBuilder::new(GridLayout::Pair).with_usage().build();
    deck.open(0);
    deck.open(1);
    *deck.usage.samples.lock().unwrap() = vec![
        sample("claude-sonnet", 20_000, 0, 0),
        sample("claude-sonnet", 40_000, 0, 0),
    ];

    deck.app.events().send(DeckEvent::UsageTick).unwrap();
    deck.app.drain_events();
    deck.app.state.focus_slot(1);
    deck.app.state.close_focused();
    deck.pump(1, 500).await;

    assert_eq!(deck.app.state.usage.breakdown(0).unwrap().ctx_pct, 10);
    assert!(deck.app.state.usage.breakdown(1).is_none());
}

#[tokio::test]
async fn test_no_live_slots_means_no_poll() {
    let mut deck = DeckBuilder::new(GridLayout::Single).with_usage().build();
    *deck.usage.samples.lock().unwrap() = vec![sample("claude-sonnet", 20_000, 0, 0)];

    deck.app.events().send(DeckEvent::UsageTick).unwrap();
    deck.app.drain_events();
    deck.pump(1, 50).await;
    assert!(deck.app.state.usage.breakdown(0).is_none());
}
