use candle_core::{Device, Result, Tensor};

/// Build `[1, T]` id and mask tensors from an encoding.
///
/// Sequences longer than `max_len` are truncated. With `pad = Some(id)` the
/// sequence is padded to exactly `max_len` with mask 0; with `None` it keeps
/// its natural length.
pub fn input_tensors(
    mut ids: Vec<u32>,
    mut mask: Vec<u32>,
    max_len: usize,
    pad: Option<u32>,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    ids.truncate(max_len);
    mask.truncate(max_len);
    if let Some(pad_id) = pad {
        let missing = max_len - ids.len();
        ids.extend(std::iter::repeat(pad_id).take(missing));
        mask.extend(std::iter::repeat(0).take(missing));
    }
    let len = ids.len();
    let input_ids = Tensor::from_vec(ids, (1, len), device)?;
    let attention_mask = Tensor::from_vec(mask, (1, len), device)?;
    Ok((input_ids, attention_mask))
}
