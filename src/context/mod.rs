//! Context management with token budget enforcement
//!
//! Token accounting plus the two policies built on it: auto-compaction with
//! recency-biased pruning, and a hysteresis-gated memory flush trigger.

pub mod compaction;
pub mod manager;
pub mod memory_flush;
pub mod models;
pub mod summarizer;
pub mod token_budget;
pub mod token_counter;
pub mod token_estimator;

pub use compaction::{prune_messages, should_auto_compact};
pub use manager::{CompactionOutcome, ContextManager, ContextStatus};
pub use memory_flush::{
    get_memory_flush_rearm_threshold, get_memory_flush_trigger_threshold, mark_flush_completed,
    set_total_tokens, should_trigger_memory_flush, FlushGate, MemoryFlushState,
};
pub use models::{Message, MessageContent, PruneResult, Role, MESSAGE_OVERHEAD_TOKENS};
pub use summarizer::{
    insert_summary, is_summary_message, summary_message, ConcatenationSummarizer, Summarizer,
    SummarizerError, SUMMARY_PREFIX,
};
pub use token_budget::{
    effective_auto_compact_threshold, format_context_usage, format_token_count,
    hard_context_budget, history_token_budget, BudgetSnapshot,
};
pub use token_counter::{
    count_message_tokens_with_model, count_tokens_with_model, count_total_tokens_with_model,
    CounterError, PreciseCount, PreciseTokenCounter, UnavailableReason,
};
pub use token_estimator::{
    estimate_message_tokens, estimate_tokens, estimate_total_tokens, HeuristicEstimator,
    TokenEstimator,
};
