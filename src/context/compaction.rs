//! Auto-compaction trigger and recency-biased message pruning

use super::models::{Message, PruneResult};
use super::token_budget::effective_auto_compact_threshold;
use super::token_estimator::estimate_message_tokens;
use crate::config::CompactionConfig;
use tracing::debug;

/// Whether `total_tokens` has reached the auto-compaction threshold (inclusive)
pub fn should_auto_compact(total_tokens: usize, config: &CompactionConfig) -> bool {
    if !config.enabled {
        return false;
    }
    total_tokens >= effective_auto_compact_threshold(config)
}

/// Prune `messages` to fit `max_tokens`.
///
/// System messages are always kept and their cost is charged first. The
/// remaining budget is filled with non-system messages from newest to
/// oldest; the first one that does not fit ends the scan, so the retained
/// history is always a contiguous suffix.
pub fn prune_messages(messages: &[Message], max_tokens: usize) -> PruneResult {
    if messages.is_empty() {
        return PruneResult::default();
    }

    let costs: Vec<usize> = messages.iter().map(estimate_message_tokens).collect();

    let system_tokens: usize = messages
        .iter()
        .zip(&costs)
        .filter(|(message, _)| message.is_system())
        .map(|(_, cost)| *cost)
        .sum();
    let available = max_tokens.saturating_sub(system_tokens);

    // Index into `messages` of the oldest retained non-system message
    let mut cutoff = messages.len();
    let mut history_tokens = 0usize;
    for (index, message) in messages.iter().enumerate().rev() {
        if message.is_system() {
            continue;
        }
        if history_tokens + costs[index] > available {
            break;
        }
        history_tokens += costs[index];
        cutoff = index;
    }

    let mut result = PruneResult::default();
    for (index, message) in messages.iter().enumerate() {
        if message.is_system() || index >= cutoff {
            result.kept.push(message.clone());
            result.kept_tokens += costs[index];
        } else {
            result.dropped.push(message.clone());
            result.dropped_tokens += costs[index];
        }
    }

    debug!(
        "Pruned to {} tokens: kept {} messages ({} tokens), dropped {} ({} tokens)",
        max_tokens,
        result.kept.len(),
        result.kept_tokens,
        result.dropped.len(),
        result.dropped_tokens
    );

    result
}
