//! Token budget derivation and usage display
//!
//! All budgets are pure functions of [`CompactionConfig`], recomputed on
//! demand and floored at one token:
//! - Hard budget: context window minus reserved response headroom
//! - Auto-compact threshold: configured trigger, capped by the hard budget
//! - History budget: configured share of the hard budget

use crate::config::CompactionConfig;
use serde::{Deserialize, Serialize};

/// Tokens usable for the prompt once response headroom is reserved
pub fn hard_context_budget(config: &CompactionConfig) -> usize {
    config
        .context_window
        .saturating_sub(config.reserve_tokens)
        .max(1)
}

/// Auto-compaction trigger point, never above the hard budget
pub fn effective_auto_compact_threshold(config: &CompactionConfig) -> usize {
    config
        .auto_compact_threshold
        .min(hard_context_budget(config))
        .max(1)
}

/// Tokens allotted to retained conversational history
pub fn history_token_budget(config: &CompactionConfig) -> usize {
    let budget = (hard_context_budget(config) as f64 * config.max_history_share).floor();
    (budget as usize).max(1)
}

/// Snapshot of every derived budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub hard_context_budget: usize,
    pub auto_compact_threshold: usize,
    pub history_token_budget: usize,
}

impl BudgetSnapshot {
    pub fn from_config(config: &CompactionConfig) -> Self {
        Self {
            hard_context_budget: hard_context_budget(config),
            auto_compact_threshold: effective_auto_compact_threshold(config),
            history_token_budget: history_token_budget(config),
        }
    }
}

/// Render a token count: plain below 1000, one-decimal thousands above
pub fn format_token_count(tokens: usize) -> String {
    if tokens >= 1000 {
        // Tenths of a thousand, ties rounded up
        let tenths = (tokens + 50) / 100;
        format!("{}.{}K", tenths / 10, tenths % 10)
    } else {
        tokens.to_string()
    }
}

/// Usage line of the form `[Context: 12.3K/128.0K (10%)]`
pub fn format_context_usage(current_tokens: usize, config: &CompactionConfig) -> String {
    let window = config.context_window.max(1);
    let percentage = (current_tokens as f64 / window as f64 * 100.0).round() as u64;
    format!(
        "[Context: {}/{} ({}%)]",
        format_token_count(current_tokens),
        format_token_count(config.context_window),
        percentage
    )
}
