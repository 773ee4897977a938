use crate::error::{Error, Result};
use crate::traits::TokenCounter;

/// Empirical word/token ratio used to turn a token budget into words.
pub const WORDS_PER_TOKEN: f64 = 0.75;
/// Inverse estimate used when no tokenizer is at hand.
pub const TOKENS_PER_WORD: f64 = 1.34;
pub const DEFAULT_BUFFER_FRACTION: f64 = 0.15;

/// Computes the chunking window for one document.
///
/// The budget reserves room for the summary prefix and a safety buffer so
/// that a merged, summary-prefixed chunk stays inside the model context:
///
/// ```text
/// tokens_left = capacity - summary_tokens
/// usable      = tokens_left - floor(tokens_left * buffer_fraction)
/// window      = 2 * floor(usable * 0.75)
/// ```
///
/// The window counts word pieces (a word or a whitespace run), hence the
/// doubling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSizer {
    capacity: usize,
    buffer_fraction: f64,
}

impl WindowSizer {
    pub fn new(capacity: usize, buffer_fraction: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Configuration("model token capacity must be positive".into()));
        }
        if !(0.0..1.0).contains(&buffer_fraction) {
            return Err(Error::Configuration(format!(
                "buffer fraction must be in [0, 1), got {buffer_fraction}"
            )));
        }
        Ok(Self { capacity, buffer_fraction })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window_size(&self, summary_tokens: usize) -> Result<usize> {
        let tokens_left = self.capacity as i64 - summary_tokens as i64;
        if tokens_left <= 0 {
            return Err(Error::Configuration(format!(
                "summary uses {summary_tokens} tokens, capacity is {}",
                self.capacity
            )));
        }
        let buffer = (tokens_left as f64 * self.buffer_fraction).floor() as i64;
        let usable = tokens_left - buffer;
        let word_budget = (usable as f64 * WORDS_PER_TOKEN).floor() as i64;
        let window = 2 * word_budget;
        if window <= 0 {
            return Err(Error::Configuration(format!(
                "computed window size {window} is not positive"
            )));
        }
        Ok(window as usize)
    }

    pub fn for_summary(&self, counter: &dyn TokenCounter, summary: &str) -> Result<usize> {
        let summary_tokens = counter.count_tokens(summary)?;
        self.window_size(summary_tokens)
    }
}

/// Token estimate from whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordEstimateCounter;

impl TokenCounter for WordEstimateCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        let words = text.split_whitespace().count();
        Ok((words as f64 * TOKENS_PER_WORD).floor() as usize)
    }
}
