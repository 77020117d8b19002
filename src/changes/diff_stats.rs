// ABOUTME: Parses unified diff text into added/removed counts and hunk start lines

use crate::models::DiffStats;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "@@ -12,4 +15,6 @@" -> old start, old count, new start, new count
    static ref HUNK_HEADER: Regex =
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap();
}

fn capture_count(caps: &regex::Captures<'_>, index: usize) -> u32 {
    // An omitted count means a single line
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}

/// Count lines in a unified diff and collect each hunk's new-file start line.
///
/// A hunk body is exactly as long as its header says, so content lines that
/// happen to start with `---` or `+++` are counted, while file headers between
/// hunks are not. Empty or unparseable text yields empty stats.
pub fn parse_unified_diff(diff: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    let mut old_remaining: u32 = 0;
    let mut new_remaining: u32 = 0;

    for line in diff.lines() {
        let in_hunk = old_remaining > 0 || new_remaining > 0;

        if line.starts_with("@@") {
            if let Some(caps) = HUNK_HEADER.captures(line) {
                if let Some(start) = caps.get(3).and_then(|m| m.as_str().parse().ok()) {
                    stats.hunk_starts.push(start);
                }
                old_remaining = capture_count(&caps, 2);
                new_remaining = capture_count(&caps, 4);
                continue;
            }
        }
        if !in_hunk {
            continue;
        }
        if line.starts_with("diff ") {
            old_remaining = 0;
            new_remaining = 0;
            continue;
        }

        match line.as_bytes().first() {
            Some(b'+') => {
                stats.added += 1;
                new_remaining = new_remaining.saturating_sub(1);
            }
            Some(b'-') => {
                stats.removed += 1;
                old_remaining = old_remaining.saturating_sub(1);
            }
            // "\ No newline at end of file"
            Some(b'\\') => {}
            // Context, including blank context lines with the leading space trimmed
            Some(b' ') | None => {
                old_remaining = old_remaining.saturating_sub(1);
                new_remaining = new_remaining.saturating_sub(1);
            }
            Some(_) => {
                old_remaining = 0;
                new_remaining = 0;
            }
        }
    }

    stats
}
