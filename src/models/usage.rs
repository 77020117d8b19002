// ABOUTME: Token-usage snapshot reported by the usage service for one agent session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only usage snapshot. Each poll replaces the previous one for a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSample {
    #[serde(default, alias = "model")]
    pub model_id: String,
    #[serde(default, alias = "input_tokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "output_tokens")]
    pub output_tokens: u64,
    #[serde(default, alias = "cache_read_tokens", alias = "cacheReadInputTokens")]
    pub cache_read_tokens: u64,
    #[serde(default, alias = "cache_write_tokens", alias = "cacheCreationInputTokens")]
    pub cache_write_tokens: u64,
    #[serde(default, alias = "last_activity")]
    pub last_activity: Option<DateTime<Utc>>,
}
