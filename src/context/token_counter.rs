//! Token counting with an optional precise counter
//!
//! A precise counter is a capability the host passes in or omits. Any
//! failure on its side only degrades precision: the heuristic estimate is
//! used instead and nothing is surfaced to the caller.

use super::models::{Message, MESSAGE_OVERHEAD_TOKENS};
use super::token_estimator::estimate_tokens;
use crate::metrics::METRICS;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;

/// Errors a precise counter may report
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("Token counting unsupported: {0}")]
    Unsupported(String),

    #[error("Token counting failed: {0}")]
    Failed(String),
}

/// Model-native token counting capability
#[async_trait]
pub trait PreciseTokenCounter: Send + Sync {
    /// Whether this counter can count tokens at all
    fn supports_token_counting(&self) -> bool {
        true
    }

    /// Count tokens in the raw text. May be fractional.
    async fn count_tokens(&self, text: &str) -> Result<f64, CounterError>;
}

/// Result of asking the precise counter
#[derive(Debug, Clone, PartialEq)]
pub enum PreciseCount {
    Counted(usize),
    Unavailable(UnavailableReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    Absent,
    Unsupported,
    InvalidValue,
    Failed,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::Absent => "absent",
            UnavailableReason::Unsupported => "unsupported",
            UnavailableReason::InvalidValue => "invalid_value",
            UnavailableReason::Failed => "failed",
        }
    }
}

/// Ask the precise counter, mapping every failure to `Unavailable`.
///
/// Reported values are rounded up, even when already integral.
pub async fn precise_count(
    text: &str,
    counter: Option<&dyn PreciseTokenCounter>,
) -> PreciseCount {
    let counter = match counter {
        Some(counter) => counter,
        None => return PreciseCount::Unavailable(UnavailableReason::Absent),
    };

    if !counter.supports_token_counting() {
        return PreciseCount::Unavailable(UnavailableReason::Unsupported);
    }

    match counter.count_tokens(text).await {
        Ok(value) if value.is_finite() && value >= 0.0 => {
            PreciseCount::Counted(value.ceil() as usize)
        }
        Ok(value) => {
            debug!("Precise counter returned invalid value {}", value);
            PreciseCount::Unavailable(UnavailableReason::InvalidValue)
        }
        Err(CounterError::Unsupported(reason)) => {
            debug!("Precise counter unsupported: {}", reason);
            PreciseCount::Unavailable(UnavailableReason::Unsupported)
        }
        Err(e) => {
            debug!("Precise counter failed: {}", e);
            PreciseCount::Unavailable(UnavailableReason::Failed)
        }
    }
}

/// Count tokens in `text`, preferring the precise counter
pub async fn count_tokens_with_model(
    text: &str,
    counter: Option<&dyn PreciseTokenCounter>,
) -> usize {
    if text.is_empty() {
        return 0;
    }

    match precise_count(text, counter).await {
        PreciseCount::Counted(tokens) => tokens,
        PreciseCount::Unavailable(reason) => {
            if reason != UnavailableReason::Absent {
                METRICS.record_count_fallback(reason.as_str());
            }
            estimate_tokens(text)
        }
    }
}

/// Count one message in its canonical form plus the structural overhead
pub async fn count_message_tokens_with_model(
    message: &Message,
    counter: Option<&dyn PreciseTokenCounter>,
) -> usize {
    count_tokens_with_model(&message.canonical_text(), counter).await + MESSAGE_OVERHEAD_TOKENS
}

/// Count all messages concurrently and sum the results
pub async fn count_total_tokens_with_model(
    messages: &[Message],
    counter: Option<&dyn PreciseTokenCounter>,
) -> usize {
    if messages.is_empty() {
        return 0;
    }

    join_all(
        messages
            .iter()
            .map(|message| count_message_tokens_with_model(message, counter)),
    )
    .await
    .into_iter()
    .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedCounter {
        value: f64,
        calls: AtomicUsize,
    }

    impl FixedCounter {
        fn new(value: f64) -> Self {
            Self {
                value,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PreciseTokenCounter for FixedCounter {
        async fn count_tokens(&self, _text: &str) -> Result<f64, CounterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }
    }

    struct FailingCounter;

    #[async_trait]
    impl PreciseTokenCounter for FailingCounter {
        async fn count_tokens(&self, _text: &str) -> Result<f64, CounterError> {
            Err(CounterError::Failed("upstream timeout".to_string()))
        }
    }

    struct IncapableCounter;

    #[async_trait]
    impl PreciseTokenCounter for IncapableCounter {
        fn supports_token_counting(&self) -> bool {
            false
        }

        async fn count_tokens(&self, _text: &str) -> Result<f64, CounterError> {
            panic!("must not be called");
        }
    }

    /// Fails or misbehaves for some texts only
    struct FlakyCounter;

    #[async_trait]
    impl PreciseTokenCounter for FlakyCounter {
        async fn count_tokens(&self, text: &str) -> Result<f64, CounterError> {
            if text.contains("timeout") {
                Err(CounterError::Failed("upstream timeout".to_string()))
            } else if text.contains("garbled") {
                Ok(f64::NAN)
            } else {
                Ok(10.0)
            }
        }
    }

    #[tokio::test]
    async fn test_empty_text_skips_counter() {
        let counter = FixedCounter::new(7.0);
        assert_eq!(count_tokens_with_model("", Some(&counter)).await, 0);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_precise_count_rounds_up() {
        let counter = FixedCounter::new(7.2);
        assert_eq!(count_tokens_with_model("anything", Some(&counter)).await, 8);

        let integral = FixedCounter::new(7.0);
        assert_eq!(count_tokens_with_model("anything", Some(&integral)).await, 7);
    }

    #[tokio::test]
    async fn test_fallbacks_use_estimator() {
        let text = "Hello world test";
        let expected = estimate_tokens(text);

        assert_eq!(count_tokens_with_model(text, None).await, expected);
        assert_eq!(count_tokens_with_model(text, Some(&FailingCounter)).await, expected);
        assert_eq!(count_tokens_with_model(text, Some(&IncapableCounter)).await, expected);
        assert_eq!(
            count_tokens_with_model(text, Some(&FixedCounter::new(-1.0))).await,
            expected
        );
        assert_eq!(
            count_tokens_with_model(text, Some(&FixedCounter::new(f64::NAN))).await,
            expected
        );
        assert_eq!(
            count_tokens_with_model(text, Some(&FixedCounter::new(f64::INFINITY))).await,
            expected
        );
    }

    #[tokio::test]
    async fn test_precise_count_reasons() {
        assert_eq!(
            precise_count("x", None).await,
            PreciseCount::Unavailable(UnavailableReason::Absent)
        );
        assert_eq!(
            precise_count("x", Some(&IncapableCounter)).await,
            PreciseCount::Unavailable(UnavailableReason::Unsupported)
        );
        assert_eq!(
            precise_count("x", Some(&FailingCounter)).await,
            PreciseCount::Unavailable(UnavailableReason::Failed)
        );
    }

    #[tokio::test]
    async fn test_message_count_adds_overhead() {
        let counter = FixedCounter::new(10.0);
        let msg = Message::user("hi");
        assert_eq!(count_message_tokens_with_model(&msg, Some(&counter)).await, 14);

        // "[user]\nhi": '[' ']' other (1.0) + "user" + "hi" (2.6) = 3.6 -> 4
        assert_eq!(count_message_tokens_with_model(&msg, None).await, 8);
    }

    #[tokio::test]
    async fn test_total_count_falls_back_per_message() {
        let counted = Message::user("fine");
        let failed = Message::assistant("request hit a timeout");
        let invalid = Message::user("garbled reply");

        let expected = (10 + MESSAGE_OVERHEAD_TOKENS)
            + estimate_tokens(&failed.canonical_text())
            + MESSAGE_OVERHEAD_TOKENS
            + estimate_tokens(&invalid.canonical_text())
            + MESSAGE_OVERHEAD_TOKENS;

        let messages = vec![counted, failed, invalid];
        assert_eq!(count_total_tokens_with_model(&messages, Some(&FlakyCounter)).await, expected);
    }

    #[tokio::test]
    async fn test_total_count() {
        let counter = FixedCounter::new(3.0);
        assert_eq!(count_total_tokens_with_model(&[], Some(&counter)).await, 0);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);

        let messages = vec![Message::system("a"), Message::user("b"), Message::assistant("c")];
        assert_eq!(count_total_tokens_with_model(&messages, Some(&counter)).await, 21);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 3);
    }
}
