use candle_core::{DType, Result, Tensor};

/// Masked mean over the sequence axis followed by L2 normalization.
///
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]` with 1 for real
/// tokens. The unmasked count is clamped to at least 1e-9 so an all-padding
/// row yields a zero vector instead of NaN.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (_batch, _seq, _hidden_dim) = hidden.dims3()?;
    let device = hidden.device();
    let dtype = hidden.dtype();

    let mask = attention_mask.to_device(device)?.to_dtype(dtype)?;
    let mask_broadcast = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_broadcast)?.sum(1)?;

    let min_count = Tensor::new(&[1e-9f32], device)?.to_dtype(dtype)?.unsqueeze(0)?;
    let counts = mask.sum(1)?.unsqueeze(1)?.broadcast_maximum(&min_count)?;
    let mean = sum.broadcast_div(&counts)?;

    let eps_val = match dtype {
        DType::F16 => 1e-6f32,
        _ => 1e-12f32,
    };
    let eps = Tensor::new(&[eps_val], device)?.to_dtype(dtype)?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    mean.broadcast_div(&norm)
}
