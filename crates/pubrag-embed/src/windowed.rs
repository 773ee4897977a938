use candle_core::{Device, Tensor};

use pubrag_core::{Embedder, Result, TokenCounter};

use crate::backbone::{candle_err, Backbone};
use crate::pool::masked_mean_l2;
use crate::registry::ModelSpec;

/// Token windows `[start, end)` of `max_len` tokens with half-window stride.
/// The last window ends at the sequence end.
pub fn token_windows(len: usize, max_len: usize) -> Vec<(usize, usize)> {
    let stride = (max_len / 2).max(1);
    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_len).min(len);
        out.push((start, end));
        if end >= len {
            break;
        }
        start += stride;
    }
    out
}

/// Embeds texts of any length with a fixed-context backbone.
///
/// A text that fits the context runs once; a longer one is cut into
/// overlapping token windows, each decoded and re-encoded with special
/// tokens, run as one batch, and pooled jointly over every window's tokens.
pub struct WindowedEmbedder<B> {
    spec: ModelSpec,
    backbone: B,
}

impl<B: Backbone> WindowedEmbedder<B> {
    pub fn new(spec: ModelSpec, backbone: B) -> Self {
        Self { spec, backbone }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn backbone(&self) -> &B {
        &self.backbone
    }

    /// Whether `text` needs more than one forward window.
    pub fn is_windowed(&self, text: &str) -> Result<bool> {
        Ok(self.backbone.tokenize(text)?.len() > self.spec.max_len)
    }

    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let max_len = self.spec.max_len;
        let tokens = self.backbone.tokenize(text)?;

        let (hidden, mask) = if tokens.len() <= max_len {
            let (ids, mask) = self.backbone.encode(text, max_len, false)?;
            (self.backbone.forward(&ids, &mask)?, mask)
        } else {
            let windows = token_windows(tokens.len(), max_len);
            tracing::debug!(tokens = tokens.len(), windows = windows.len(), "embedding long text");
            let mut ids = Vec::with_capacity(windows.len());
            let mut masks = Vec::with_capacity(windows.len());
            for (start, end) in windows {
                let window_text = self.backbone.detokenize(&tokens[start..end])?;
                let (i, m) = self.backbone.encode(&window_text, max_len, true)?;
                ids.push(i);
                masks.push(m);
            }
            let ids = Tensor::cat(&ids, 0).map_err(candle_err)?;
            let mask = Tensor::cat(&masks, 0).map_err(candle_err)?;
            let hidden = self.backbone.forward(&ids, &mask)?;
            // [W, T, H] -> [1, W*T, H]: windows joined along the sequence axis.
            let (w, t, h) = hidden.dims3().map_err(candle_err)?;
            (
                hidden.reshape((1, w * t, h)).map_err(candle_err)?,
                mask.reshape((1, w * t)).map_err(candle_err)?,
            )
        };

        masked_mean_l2(&hidden, &mask)
            .and_then(|v| v.to_device(&Device::Cpu))
            .and_then(|v| v.squeeze(0))
            .and_then(|v| v.to_vec1::<f32>())
            .map_err(candle_err)
    }
}

impl<B: Backbone> TokenCounter for WindowedEmbedder<B> {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.backbone.tokenize(text)?.len())
    }
}

impl<B: Backbone> Embedder for WindowedEmbedder<B> {
    fn model_id(&self) -> &str {
        &self.spec.id
    }

    fn dim(&self) -> usize {
        self.backbone.hidden_size()
    }

    fn max_len(&self) -> usize {
        self.spec.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}
