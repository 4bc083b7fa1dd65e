//! Metrics collection for compaction decisions

use once_cell::sync::Lazy;
use prometheus::{
    exponential_buckets, register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Encoder, Histogram, HistogramOpts,
    Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Token accounting
    pub token_count_fallbacks: CounterVec,
    pub context_tokens: Histogram,

    // Compaction
    pub auto_compactions: Counter,
    pub pruned_messages: Counter,
    pub summarizations: Counter,

    // Memory flush gate
    pub memory_flushes: Counter,
    pub memory_flush_rearms: Counter,
}

impl Metrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let token_count_fallbacks = register_counter_vec_with_registry!(
            Opts::new(
                "token_count_fallbacks_total",
                "Precise token counts replaced by the heuristic estimate"
            ),
            &["reason"],
            registry
        )?;

        let context_tokens = register_histogram_with_registry!(
            HistogramOpts::new("context_tokens", "Observed conversation token totals")
                .buckets(exponential_buckets(1000.0, 2.0, 10)?),
            registry
        )?;

        let auto_compactions = register_counter_with_registry!(
            Opts::new(
                "auto_compactions_total",
                "Observations that crossed the auto-compact threshold"
            ),
            registry
        )?;

        let pruned_messages = register_counter_with_registry!(
            Opts::new("pruned_messages_total", "Messages dropped by pruning"),
            registry
        )?;

        let summarizations = register_counter_with_registry!(
            Opts::new("summarizations_total", "Summaries inserted after pruning"),
            registry
        )?;

        let memory_flushes = register_counter_with_registry!(
            Opts::new("memory_flushes_total", "Memory flushes marked completed"),
            registry
        )?;

        let memory_flush_rearms = register_counter_with_registry!(
            Opts::new("memory_flush_rearms_total", "Times the memory flush gate rearmed"),
            registry
        )?;

        Ok(Self {
            registry,
            token_count_fallbacks,
            context_tokens,
            auto_compactions,
            pruned_messages,
            summarizations,
            memory_flushes,
            memory_flush_rearms,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a fallback from the precise counter to the estimator
    pub fn record_count_fallback(&self, reason: &str) {
        self.token_count_fallbacks.with_label_values(&[reason]).inc();
    }

    /// Record an observed conversation total
    pub fn record_context_tokens(&self, total: usize, compacting: bool) {
        self.context_tokens.observe(total as f64);
        if compacting {
            self.auto_compactions.inc();
        }
    }

    /// Record a pruning pass
    pub fn record_prune(&self, dropped: usize, summarized: bool) {
        self.pruned_messages.inc_by(dropped as f64);
        if summarized {
            self.summarizations.inc();
        }
    }

    pub fn record_memory_flush(&self) {
        self.memory_flushes.inc();
    }

    pub fn record_memory_flush_rearm(&self) {
        self.memory_flush_rearms.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
