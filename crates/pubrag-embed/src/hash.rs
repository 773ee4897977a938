use std::hash::Hasher;

use candle_core::{Device, Tensor};
use twox_hash::XxHash64;

use pubrag_core::{Error, Result};

use crate::backbone::{candle_err, Backbone};
use crate::tokenize::input_tensors;

const CLS: u32 = 0x11_0000;
const SEP: u32 = 0x11_0001;
const PAD: u32 = 0x11_0002;

/// Deterministic stand-in for a transformer: every character is one token
/// and its hidden state is derived from xxhash of the token id. Runs on the
/// same windowing and pooling path as the real model, without weights.
#[derive(Debug, Clone)]
pub struct HashBackbone {
    dim: usize,
    device: Device,
}

impl HashBackbone {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Configuration("fake embedding dimension must be positive".into()));
        }
        Ok(Self { dim, device: Device::Cpu })
    }

    fn token_vector(&self, id: u32, out: &mut Vec<f32>) {
        for j in 0..self.dim {
            let mut hasher = XxHash64::with_seed(j as u64);
            hasher.write_u32(id);
            let h = hasher.finish();
            out.push(((h >> 32) as u32) as f32 / u32::MAX as f32 * 2.0 - 1.0);
        }
    }
}

impl Backbone for HashBackbone {
    fn hidden_size(&self) -> usize {
        self.dim
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn detokenize(&self, ids: &[u32]) -> Result<String> {
        Ok(ids.iter().filter_map(|&id| char::from_u32(id)).collect())
    }

    fn encode(&self, text: &str, max_len: usize, pad: bool) -> Result<(Tensor, Tensor)> {
        let mut ids = Vec::with_capacity(text.len() + 2);
        ids.push(CLS);
        ids.extend(text.chars().map(u32::from));
        ids.push(SEP);
        let mask = vec![1u32; ids.len()];
        input_tensors(ids, mask, max_len, pad.then_some(PAD), &self.device).map_err(candle_err)
    }

    fn forward(&self, ids: &Tensor, _mask: &Tensor) -> Result<Tensor> {
        let rows = ids.to_vec2::<u32>().map_err(candle_err)?;
        let batch = rows.len();
        let seq = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(batch * seq * self.dim);
        for id in rows.iter().flatten() {
            self.token_vector(*id, &mut data);
        }
        Tensor::from_vec(data, (batch, seq, self.dim), &self.device).map_err(candle_err)
    }
}
