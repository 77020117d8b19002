// ABOUTME: Change tracking: feeds of filesystem events, diff sources and the per-slot correlator

pub mod correlator;
pub mod diff_source;
pub mod diff_stats;
pub mod feed;

pub use correlator::{ChangeCorrelator, DiffTicket, DEFAULT_CAPACITY};
pub use diff_source::{DiffRequest, DiffSource, GitDiffSource, HttpDiffSource};
pub use diff_stats::parse_unified_diff;
pub use feed::{parse_feed_message, spawn_remote_feed, LocalChangeWatcher};
