// ABOUTME: Recency-ordered list of changed files, correlated with async diff results
//
// The correlator itself never waits on anything. A change event returns a
// `DiffTicket`; the caller fetches the diff in the background and hands the
// text back with the ticket. Results for tickets whose entry was evicted,
// replaced by a newer event or cleared are discarded.

use crate::changes::diff_stats::parse_unified_diff;
use crate::models::{ChangeEntry, DiffStats, FsChange, FsEventKind};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 8;

/// Identifies one pending diff fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffTicket {
    pub path: String,
    pub seq: u64,
}

#[derive(Debug, Clone)]
pub struct ChangeCorrelator {
    entries: Vec<ChangeEntry>,
    // path -> seq of the ticket still allowed to land
    pending: HashMap<String, u64>,
    next_seq: u64,
    capacity: usize,
}

impl Default for ChangeCorrelator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeCorrelator {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            pending: HashMap::new(),
            next_seq: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn on_change_event(&mut self, change: FsChange) -> Option<DiffTicket> {
        self.on_change_event_at(change, Utc::now())
    }

    /// Upsert `change` at the front. Returns a ticket when a diff should be
    /// fetched (never for deletions).
    pub fn on_change_event_at(
        &mut self,
        change: FsChange,
        now: DateTime<Utc>,
    ) -> Option<DiffTicket> {
        let previous = self
            .entries
            .iter()
            .position(|e| e.path == change.path)
            .map(|idx| self.entries.remove(idx));

        let mut entry = ChangeEntry::new(change.path.clone(), change.kind, now);
        if change.kind != FsEventKind::Deleted {
            // Keep the last known stats visible until the new diff lands
            if let Some(previous) = previous {
                entry.added = previous.added;
                entry.removed = previous.removed;
                entry.hunk_starts = previous.hunk_starts;
            }
        }
        self.entries.insert(0, entry);

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop() {
                debug!("Evicted {} from recent changes", evicted.path);
                self.pending.remove(&evicted.path);
            }
        }

        if change.kind == FsEventKind::Deleted {
            self.pending.remove(&change.path);
            return None;
        }

        self.next_seq += 1;
        self.pending.insert(change.path.clone(), self.next_seq);
        Some(DiffTicket {
            path: change.path,
            seq: self.next_seq,
        })
    }

    /// Merge diff text for `ticket`. Returns false when the result is stale.
    pub fn apply_diff(&mut self, ticket: &DiffTicket, diff: &str) -> bool {
        self.apply_stats(ticket, parse_unified_diff(diff))
    }

    /// Merge a fetch outcome. A failed fetch leaves the entry with zeroed stats.
    pub fn apply_diff_result<E: std::fmt::Display>(
        &mut self,
        ticket: &DiffTicket,
        result: Result<String, E>,
    ) -> bool {
        match result {
            Ok(diff) => self.apply_diff(ticket, &diff),
            Err(err) => {
                debug!("Diff fetch for {} failed: {}", ticket.path, err);
                if !self.take_pending(ticket) {
                    return false;
                }
                if let Some(entry) = self.entry_mut(&ticket.path) {
                    entry.clear_stats();
                }
                true
            }
        }
    }

    fn apply_stats(&mut self, ticket: &DiffTicket, stats: DiffStats) -> bool {
        if !self.take_pending(ticket) {
            debug!(
                "Discarding stale diff for {} (ticket {})",
                ticket.path, ticket.seq
            );
            return false;
        }
        match self.entry_mut(&ticket.path) {
            Some(entry) => {
                entry.merge_stats(stats);
                true
            }
            None => false,
        }
    }

    fn take_pending(&mut self, ticket: &DiffTicket) -> bool {
        if self.pending.get(&ticket.path) == Some(&ticket.seq) {
            self.pending.remove(&ticket.path);
            true
        } else {
            false
        }
    }

    fn entry_mut(&mut self, path: &str) -> Option<&mut ChangeEntry> {
        self.entries.iter_mut().find(|e| e.path == path)
    }

    /// Most recent first
    pub fn recent_changes(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}
