//! Memory flush hysteresis gate
//!
//! A flush fires at most once per excursion above the trigger threshold.
//! After [`mark_flush_completed`] the gate stays cooling until an observed
//! total falls to or below the rearm threshold, which sits strictly under
//! the trigger.

use super::token_budget::effective_auto_compact_threshold;
use crate::config::CompactionConfig;
use serde::{Deserialize, Serialize};

/// Gate position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushGate {
    /// A flush may fire
    Armed,
    /// A flush already fired this cycle
    Cooling,
}

/// Per-session flush state. Each session owns its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFlushState {
    pub total_tokens: usize,
    pub gate: FlushGate,
}

impl Default for MemoryFlushState {
    fn default() -> Self {
        Self::initial()
    }
}

impl MemoryFlushState {
    pub const fn initial() -> Self {
        Self {
            total_tokens: 0,
            gate: FlushGate::Armed,
        }
    }

    pub fn flush_cycle_armed(&self) -> bool {
        self.gate == FlushGate::Armed
    }
}

/// Flush trigger point; identical to the auto-compaction threshold
pub fn get_memory_flush_trigger_threshold(config: &CompactionConfig) -> usize {
    effective_auto_compact_threshold(config)
}

/// Level at or below which a cooling gate rearms
pub fn get_memory_flush_rearm_threshold(config: &CompactionConfig) -> usize {
    get_memory_flush_trigger_threshold(config).saturating_sub(config.memory_flush_rearm_gap.max(1))
}

/// Record an observed total. Only ever moves the gate from cooling to armed.
pub fn set_total_tokens(
    state: MemoryFlushState,
    tokens: usize,
    config: &CompactionConfig,
) -> MemoryFlushState {
    let gate = match state.gate {
        FlushGate::Cooling if tokens <= get_memory_flush_rearm_threshold(config) => {
            FlushGate::Armed
        }
        gate => gate,
    };

    MemoryFlushState {
        total_tokens: tokens,
        gate,
    }
}

pub fn should_trigger_memory_flush(state: &MemoryFlushState, config: &CompactionConfig) -> bool {
    state.flush_cycle_armed() && state.total_tokens >= get_memory_flush_trigger_threshold(config)
}

/// Move the gate to cooling; idempotent
pub fn mark_flush_completed(state: MemoryFlushState) -> MemoryFlushState {
    MemoryFlushState {
        gate: FlushGate::Cooling,
        ..state
    }
}
