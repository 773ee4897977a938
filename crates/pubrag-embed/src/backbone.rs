use candle_core::{Device, Tensor};
use pubrag_core::{Error, Result};

/// Tokenizer plus encoder network producing per-token hidden states.
pub trait Backbone: Send + Sync {
    fn hidden_size(&self) -> usize;
    fn device(&self) -> &Device;
    /// Token ids without special tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>>;
    fn detokenize(&self, ids: &[u32]) -> Result<String>;
    /// `[1, T]` ids and attention mask with special tokens, truncated to
    /// `max_len` and, when `pad` is set, padded to exactly `max_len`.
    fn encode(&self, text: &str, max_len: usize, pad: bool) -> Result<(Tensor, Tensor)>;
    /// `[B, T]` ids and mask to `[B, T, H]` hidden states.
    fn forward(&self, ids: &Tensor, mask: &Tensor) -> Result<Tensor>;
}

pub(crate) fn candle_err(e: candle_core::Error) -> Error {
    Error::external("inference", e)
}
