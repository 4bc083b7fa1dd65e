//! Heuristic token estimation
//!
//! Used whenever no precise tokenizer is available. Weights are kept in
//! tenths of a token so the sum is exact before rounding up.

use super::models::{Message, MESSAGE_OVERHEAD_TOKENS};

const CJK_WEIGHT_TENTHS: usize = 10;
const WORD_WEIGHT_TENTHS: usize = 13;
const OTHER_WEIGHT_TENTHS: usize = 5;

/// Token estimator trait for different estimation strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Estimate tokens for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }
}

/// Character-class estimator: CJK characters count 1, ASCII-letter runs
/// count 1.3 per run, any other visible character counts 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
            | '\u{3400}'..='\u{4DBF}' // extension A
            | '\u{F900}'..='\u{FAFF}' // compatibility ideographs
            | '\u{3040}'..='\u{30FF}' // hiragana, katakana
            | '\u{AC00}'..='\u{D7AF}' // hangul syllables
    )
}

/// Estimate tokens in `text`, rounding up
pub fn estimate_tokens(text: &str) -> usize {
    let mut cjk = 0usize;
    let mut words = 0usize;
    let mut other = 0usize;
    let mut in_word = false;

    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            if !in_word {
                words += 1;
                in_word = true;
            }
            continue;
        }
        in_word = false;

        if is_cjk(c) {
            cjk += 1;
        } else if !c.is_whitespace() {
            other += 1;
        }
    }

    let tenths = cjk * CJK_WEIGHT_TENTHS + words * WORD_WEIGHT_TENTHS + other * OTHER_WEIGHT_TENTHS;
    tenths.div_ceil(10)
}

/// Estimate tokens for one message including its structural overhead
pub fn estimate_message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.text()) + MESSAGE_OVERHEAD_TOKENS
}

/// Sum of per-message estimates
pub fn estimate_total_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
