// ABOUTME: Context-window usage tracking and the usage service client

pub mod source;
pub mod tracker;

pub use source::{HttpUsageSource, UsageSource};
pub use tracker::{quantize, ContextUsageTracker, ContextWindows, UsageBreakdown, UsageCategory};
