//! Bounded conversational context for language-model agents
//!
//! Estimates how many tokens a conversation occupies, decides when that
//! occupation crosses the configured limits, and prunes or summarizes older
//! turns so the live context stays within budget.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;

pub use crate::config::{CompactionConfig, LoggingConfig, Settings};
pub use crate::error::{ContextError, Result};
