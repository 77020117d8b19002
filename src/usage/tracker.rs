// ABOUTME: Per-slot token usage: context-window percentages and the quantized usage bar

use crate::models::UsageSample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_BAR_CELLS: usize = 100;

/// Context window sizes by model class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindows {
    pub standard: u64,
    pub large: u64,
}

impl Default for ContextWindows {
    fn default() -> Self {
        Self {
            standard: 200_000,
            large: 1_000_000,
        }
    }
}

impl ContextWindows {
    /// Large-context models carry a "1m" marker in their id
    pub fn window_for(&self, model_id: &str) -> u64 {
        let id = model_id.to_ascii_lowercase();
        if id.contains("[1m]") || id.contains("-1m") {
            self.large
        } else {
            self.standard
        }
    }
}

/// Stacked bar bands, in drawing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageCategory {
    CacheRead,
    CacheWrite,
    Input,
    Free,
}

impl UsageCategory {
    pub const ORDER: [UsageCategory; 4] = [
        UsageCategory::CacheRead,
        UsageCategory::CacheWrite,
        UsageCategory::Input,
        UsageCategory::Free,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            UsageCategory::CacheRead => "cache read",
            UsageCategory::CacheWrite => "cache write",
            UsageCategory::Input => "input",
            UsageCategory::Free => "free",
        }
    }
}

/// Whole-number percentages of the context window.
/// `cache_read_pct + cache_write_pct + input_pct == ctx_pct` and
/// `ctx_pct + free_pct == 100` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageBreakdown {
    pub ctx_pct: u8,
    pub cache_read_pct: u8,
    pub cache_write_pct: u8,
    pub input_pct: u8,
    pub free_pct: u8,
}

impl UsageBreakdown {
    pub fn from_sample(sample: &UsageSample, window: u64) -> Self {
        let ctx = percent_of(sample.input_tokens, window);
        let cache_read = percent_of(sample.cache_read_tokens, window).min(ctx);
        let cache_write = percent_of(sample.cache_write_tokens, window).min(ctx - cache_read);
        Self {
            ctx_pct: ctx,
            cache_read_pct: cache_read,
            cache_write_pct: cache_write,
            input_pct: ctx - cache_read - cache_write,
            free_pct: 100 - ctx,
        }
    }

    pub fn percent(&self, category: UsageCategory) -> u8 {
        match category {
            UsageCategory::CacheRead => self.cache_read_pct,
            UsageCategory::CacheWrite => self.cache_write_pct,
            UsageCategory::Input => self.input_pct,
            UsageCategory::Free => self.free_pct,
        }
    }
}

/// round(tokens / window * 100), capped at 100
fn percent_of(tokens: u64, window: u64) -> u8 {
    if window == 0 {
        return 0;
    }
    let tokens = tokens as u128;
    let window = window as u128;
    let pct = (tokens * 100 + window / 2) / window;
    pct.min(100) as u8
}

/// Fill `cells` cells: cell i takes the first band whose cumulative
/// percentage reaches i+1 (scaled to the cell count).
pub fn quantize(breakdown: &UsageBreakdown, cells: usize) -> Vec<UsageCategory> {
    let mut bands = Vec::with_capacity(UsageCategory::ORDER.len());
    let mut cumulative = 0usize;
    for category in UsageCategory::ORDER {
        cumulative += breakdown.percent(category) as usize;
        bands.push((category, cumulative));
    }

    (0..cells)
        .map(|i| {
            bands
                .iter()
                .find(|(_, cum)| (i + 1) * 100 <= cum * cells)
                .map(|(category, _)| *category)
                .unwrap_or(UsageCategory::Free)
        })
        .collect()
}

#[derive(Debug, Clone)]
struct TrackedSample {
    generation: u64,
    sample: UsageSample,
}

/// Latest usage sample per slot
#[derive(Debug, Clone)]
pub struct ContextUsageTracker {
    windows: ContextWindows,
    cells: usize,
    samples: HashMap<usize, TrackedSample>,
}

impl Default for ContextUsageTracker {
    fn default() -> Self {
        Self::new(ContextWindows::default(), DEFAULT_BAR_CELLS)
    }
}

impl ContextUsageTracker {
    pub fn new(windows: ContextWindows, cells: usize) -> Self {
        Self {
            windows,
            cells: cells.max(1),
            samples: HashMap::new(),
        }
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Replace the sample for a slot
    pub fn apply(&mut self, slot: usize, generation: u64, sample: UsageSample) {
        self.samples.insert(slot, TrackedSample { generation, sample });
    }

    /// Apply a poll result. Samples are matched to `targets` by position and
    /// only kept for targets that `is_current` still accepts. Returns how many
    /// were applied.
    pub fn apply_poll<F>(
        &mut self,
        targets: &[(usize, u64)],
        samples: Vec<UsageSample>,
        is_current: F,
    ) -> usize
    where
        F: Fn(usize, u64) -> bool,
    {
        let mut applied = 0;
        for (&(slot, generation), sample) in targets.iter().zip(samples) {
            if !is_current(slot, generation) {
                debug!(
                    "Discarding usage for slot {} (generation {} superseded)",
                    slot, generation
                );
                continue;
            }
            self.apply(slot, generation, sample);
            applied += 1;
        }
        applied
    }

    pub fn sample(&self, slot: usize) -> Option<&UsageSample> {
        self.samples.get(&slot).map(|t| &t.sample)
    }

    pub fn breakdown(&self, slot: usize) -> Option<UsageBreakdown> {
        self.sample(slot).map(|sample| {
            UsageBreakdown::from_sample(sample, self.windows.window_for(&sample.model_id))
        })
    }

    pub fn bar(&self, slot: usize) -> Option<Vec<UsageCategory>> {
        self.breakdown(slot).map(|b| quantize(&b, self.cells))
    }

    pub fn forget(&mut self, slot: usize) {
        self.samples.remove(&slot);
    }

    /// Drop samples whose slot has closed or relaunched
    pub fn retain_live<F>(&mut self, is_current: F)
    where
        F: Fn(usize, u64) -> bool,
    {
        self.samples
            .retain(|slot, tracked| is_current(*slot, tracked.generation));
    }
}
