// ABOUTME: Change-tracking data model: filesystem events and per-file diff stats

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of filesystem event reported by the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
}

impl FsEventKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            FsEventKind::Created => "A",
            FsEventKind::Modified => "M",
            FsEventKind::Deleted => "D",
        }
    }
}

impl fmt::Display for FsEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsEventKind::Created => "created",
            FsEventKind::Modified => "modified",
            FsEventKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// A single change notification, as delivered by the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub path: String,
    pub kind: FsEventKind,
}

impl FsChange {
    pub fn new(path: impl Into<String>, kind: FsEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Line statistics parsed from a unified diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: u32,
    pub removed: u32,
    /// New-file start line of each hunk, in diff order
    pub hunk_starts: Vec<u32>,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.hunk_starts.is_empty()
    }
}

/// One row of the recent-changes list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub path: String,
    pub event: FsEventKind,
    pub observed_at: DateTime<Utc>,
    pub added: u32,
    pub removed: u32,
    pub hunk_starts: Vec<u32>,
}

impl ChangeEntry {
    pub fn new(path: String, event: FsEventKind, observed_at: DateTime<Utc>) -> Self {
        Self {
            path,
            event,
            observed_at,
            added: 0,
            removed: 0,
            hunk_starts: Vec::new(),
        }
    }

    pub fn merge_stats(&mut self, stats: DiffStats) {
        self.added = stats.added;
        self.removed = stats.removed;
        self.hunk_starts = stats.hunk_starts;
    }

    pub fn clear_stats(&mut self) {
        self.added = 0;
        self.removed = 0;
        self.hunk_starts.clear();
    }

    /// Short "+a -r @h1,h2" summary, empty when nothing is known yet
    pub fn format_stats(&self) -> String {
        if self.added == 0 && self.removed == 0 && self.hunk_starts.is_empty() {
            return String::new();
        }
        let mut summary = format!("+{} -{}", self.added, self.removed);
        if !self.hunk_starts.is_empty() {
            let starts: Vec<String> = self.hunk_starts.iter().map(u32::to_string).collect();
            summary.push_str(&format!(" @{}", starts.join(",")));
        }
        summary
    }
}
