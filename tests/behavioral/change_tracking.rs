// ABOUTME: Behavioral tests for routing file changes to slots and correlating diff stats

use crate::fixtures::DeckBuilder;
use agentgrid::events::DeckEvent;
use agentgrid::models::{FsChange, FsEventKind, GridLayout};
use pretty_assertions::assert_eq;

const DIFF: &str = "\
diff --git a/src/a.rs b/src/a.rs
--- a/src/a.rs
+++ b/src/a.rs
@@ -1,3 +1,4 @@
 fn main() {
-    old();
+    new();
+    more();
 }
";

fn post(deck: &crate::fixtures::TestDeck, path: &str, kind: FsEventKind) {
    deck.app
        .events()
        .send(DeckEvent::FsChange(FsChange::new(path, kind)))
        .unwrap();
}

#[tokio::test]
async fn test_change_gets_stats_from_diff() {
    let mut deck = DeckBuilder::new(GridLayout::Single)
        .diff("/work/src/a.rs", DIFF)
        .build();
    deck.open(0);

    post(&deck, "/work/src/a.rs", FsEventKind::Modified);
    deck.app.drain_events();
    let entries = deck.app.state.changes[0].recent_changes();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].added, 0);

    deck.pump(1, 500).await;
    let entry = &deck.app.state.changes[0].recent_changes()[0];
    assert_eq!(entry.path, "/work/src/a.rs");
    assert_eq!((entry.added, entry.removed), (2, 1));
    assert_eq!(entry.hunk_starts, vec![1]);
}

#[tokio::test]
async fn test_ninth_path_evicts_oldest_and_late_diff_is_discarded() {
    let mut builder = DeckBuilder::new(GridLayout::Single);
    for i in 0..9 {
        builder = builder.diff(&format!("/work/f{}.rs", i), DIFF);
    }
    let mut deck = builder.build();
    deck.open(0);

    for i in 0..9 {
        post(&deck, &format!("/work/f{}.rs", i), FsEventKind::Modified);
    }
    deck.app.drain_events();
    deck.pump(9, 500).await;

    let entries = deck.app.state.changes[0].recent_changes();
    assert_eq!(entries.len(), 8);
    assert!(entries.iter().all(|e| e.path != "/work/f0.rs"));
    assert_eq!(entries[0].path, "/work/f8.rs");
    assert!(entries.iter().all(|e| e.added == 2 && e.removed == 1));
}

#[tokio::test]
async fn test_repeat_event_moves_entry_to_front() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);

    post(&deck, "/work/a.rs", FsEventKind::Created);
    post(&deck, "/work/b.rs", FsEventKind::Created);
    post(&deck, "/work/a.rs", FsEventKind::Deleted);
    deck.app.drain_events();

    let entries = deck.app.state.changes[0].recent_changes();
    let summary: Vec<(&str, FsEventKind)> =
        entries.iter().map(|e| (e.path.as_str(), e.event)).collect();
    assert_eq!(
        summary,
        vec![
            ("/work/a.rs", FsEventKind::Deleted),
            ("/work/b.rs", FsEventKind::Created)
        ]
    );
}

#[tokio::test]
async fn test_changes_route_only_to_slots_that_contain_them() {
    let mut deck = DeckBuilder::new(GridLayout::Pair).build();
    deck.open(0);

    post(&deck, "/elsewhere/x.rs", FsEventKind::Modified);
    post(&deck, "/work/y.rs", FsEventKind::Modified);
    post(&deck, "relative/z.rs", FsEventKind::Modified);
    deck.app.drain_events();

    let paths: Vec<&str> = deck.app.state.changes[0]
        .recent_changes()
        .iter()
        .map(|e| e.path.as_str())
        .collect();
    assert_eq!(paths, vec!["relative/z.rs", "/work/y.rs"]);

    // Slot 1 is idle and sees nothing
    assert!(deck.app.state.changes[1].is_empty());
}

#[tokio::test]
async fn test_diff_for_closed_slot_is_discarded() {
    let mut deck = DeckBuilder::new(GridLayout::Single)
        .diff("/work/src/a.rs", DIFF)
        .build();
    deck.open(0);

    post(&deck, "/work/src/a.rs", FsEventKind::Modified);
    deck.app.drain_events();
    deck.app.state.close_focused();
    deck.pump(1, 500).await;

    let entry = &deck.app.state.changes[0].recent_changes()[0];
    assert_eq!((entry.added, entry.removed), (0, 0));
}

#[tokio::test]
async fn test_failed_diff_leaves_zero_stats() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);

    post(&deck, "/work/unknown.rs", FsEventKind::Modified);
    deck.app.drain_events();
    deck.pump(1, 500).await;

    let entry = &deck.app.state.changes[0].recent_changes()[0];
    assert_eq!(entry.format_stats(), "");
}

#[tokio::test]
async fn test_relaunch_clears_change_list() {
    let mut deck = DeckBuilder::new(GridLayout::Single).build();
    deck.open(0);
    post(&deck, "/work/a.rs", FsEventKind::Created);
    deck.app.drain_events();
    assert!(!deck.app.state.changes[0].is_empty());

    deck.app.state.close_focused();
    deck.open(0);
    assert!(deck.app.state.changes[0].is_empty());
}
