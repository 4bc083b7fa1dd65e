//! Session-level context manager
//!
//! Ties the pieces together for one conversation:
//! - Token measurement with an optional precise counter
//! - Auto-compaction decisions
//! - The memory flush gate, owned exclusively by this session
//! - Prune-then-summarize compaction

use super::compaction::{prune_messages, should_auto_compact};
use super::memory_flush::{
    mark_flush_completed, set_total_tokens, should_trigger_memory_flush, MemoryFlushState,
};
use super::models::{Message, PruneResult};
use super::summarizer::{insert_summary, is_summary_message, summary_message, Summarizer};
use super::token_budget::{format_context_usage, history_token_budget};
use super::token_counter::{count_total_tokens_with_model, PreciseTokenCounter};
use crate::config::CompactionConfig;
use crate::error::{ContextError, Result};
use crate::metrics::METRICS;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decisions derived from one observation of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextStatus {
    pub total_tokens: usize,
    pub should_compact: bool,
    pub should_flush: bool,
    /// Display line, e.g. `[Context: 54.0K/128.0K (42%)]`
    pub usage: String,
}

/// Result of a compaction pass
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    /// New history: kept messages plus the summary when one was produced
    pub messages: Vec<Message>,
    pub prune: PruneResult,
    pub summarized: bool,
}

/// Context manager for a single conversation
pub struct ContextManager {
    config: CompactionConfig,
    counter: Option<Arc<dyn PreciseTokenCounter>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    flush_state: MemoryFlushState,
}

impl ContextManager {
    /// Create a manager that estimates tokens heuristically and only prunes
    pub fn new(config: CompactionConfig) -> Self {
        Self {
            config,
            counter: None,
            summarizer: None,
            flush_state: MemoryFlushState::initial(),
        }
    }

    /// Use a model-native token counter, falling back to the estimator
    pub fn with_token_counter(mut self, counter: Arc<dyn PreciseTokenCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Summarize dropped history during compaction
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn flush_state(&self) -> &MemoryFlushState {
        &self.flush_state
    }

    /// Total tokens of `messages`
    pub async fn measure(&self, messages: &[Message]) -> usize {
        count_total_tokens_with_model(messages, self.counter.as_deref()).await
    }

    /// Measure `messages`, feed the flush gate and report what should happen
    pub async fn observe(&mut self, messages: &[Message]) -> ContextStatus {
        let total_tokens = self.measure(messages).await;

        let was_armed = self.flush_state.flush_cycle_armed();
        self.flush_state = set_total_tokens(self.flush_state, total_tokens, &self.config);
        if !was_armed && self.flush_state.flush_cycle_armed() {
            info!("Memory flush gate rearmed at {} tokens", total_tokens);
            METRICS.record_memory_flush_rearm();
        }

        let should_compact = should_auto_compact(total_tokens, &self.config);
        let should_flush = should_trigger_memory_flush(&self.flush_state, &self.config);
        METRICS.record_context_tokens(total_tokens, should_compact);

        let usage = format_context_usage(total_tokens, &self.config);
        if should_compact {
            info!("Auto-compaction threshold reached {}", usage);
        } else {
            debug!("Context usage {}", usage);
        }

        ContextStatus {
            total_tokens,
            should_compact,
            should_flush,
            usage,
        }
    }

    /// Close the current flush cycle; the gate stays cooling until usage drops
    pub fn mark_flush_completed(&mut self) {
        self.flush_state = mark_flush_completed(self.flush_state);
        METRICS.record_memory_flush();
        info!("Memory flush completed at {} tokens", self.flush_state.total_tokens);
    }

    /// Compact to the configured history budget
    pub async fn compact(&self, messages: &[Message]) -> Result<CompactionOutcome> {
        self.compact_to_budget(messages, history_token_budget(&self.config))
            .await
    }

    /// Prune to `max_tokens` and replace dropped history with a summary.
    ///
    /// Summaries from earlier passes are taken out before pruning and folded
    /// into the new one, so a compacted history carries at most one summary.
    pub async fn compact_to_budget(
        &self,
        messages: &[Message],
        max_tokens: usize,
    ) -> Result<CompactionOutcome> {
        let (previous, history): (Vec<Message>, Vec<Message>) =
            messages.iter().cloned().partition(is_summary_message);
        let prune = prune_messages(&history, max_tokens);

        let summarizer = match &self.summarizer {
            Some(summarizer) if !prune.is_noop() || previous.len() > 1 => summarizer,
            _ => {
                METRICS.record_prune(prune.dropped.len(), false);
                let messages = previous.into_iter().fold(prune.kept.clone(), insert_summary);
                return Ok(CompactionOutcome {
                    messages,
                    prune,
                    summarized: false,
                });
            }
        };

        let mut to_summarize = previous;
        let folded = to_summarize.len();
        to_summarize.extend(prune.dropped.iter().cloned());

        let summary = summarizer.summarize(&to_summarize).await.map_err(|e| {
            warn!("Summarizing {} dropped messages failed: {}", to_summarize.len(), e);
            ContextError::Summarization(e.to_string())
        })?;

        METRICS.record_prune(prune.dropped.len(), true);
        info!(
            "Compacted {} messages ({} tokens) and {} earlier summaries into a summary",
            prune.dropped.len(),
            prune.dropped_tokens,
            folded
        );

        Ok(CompactionOutcome {
            messages: insert_summary(prune.kept.clone(), summary_message(&summary)),
            prune,
            summarized: true,
        })
    }
}
