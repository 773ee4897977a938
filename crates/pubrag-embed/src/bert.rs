use std::collections::HashMap;
use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use pubrag_core::{Error, Result};

use crate::backbone::{candle_err, Backbone};
use crate::tokenize::input_tensors;

/// BERT-family encoder loaded from a local export directory holding
/// `tokenizer.json`, `config.json` and `model.safetensors` (or
/// `pytorch_model.bin`).
pub struct TransformerBackbone {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
    pad_id: u32,
}

impl TransformerBackbone {
    pub fn load(model_dir: &Path, device: Device) -> Result<Self> {
        if !model_dir.is_dir() {
            return Err(Error::Configuration(format!(
                "model directory {} does not exist",
                model_dir.display()
            )));
        }
        tracing::info!(model_dir = %model_dir.display(), "loading transformer backbone");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::external(&format!("loading tokenizer {}", tokenizer_path.display()), e))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| Error::external("configuring tokenizer", e))?;
        let pad_id = ["[PAD]", "<pad>"]
            .iter()
            .find_map(|t| tokenizer.token_to_id(t))
            .unwrap_or(0);

        let raw_config = fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let hidden_size = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| Error::Configuration("config.json has no hidden_size".into()))?;

        let safetensors = model_dir.join("model.safetensors");
        let weights: HashMap<String, Tensor> = if safetensors.exists() {
            candle_core::safetensors::load(&safetensors, &device)
        } else {
            candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))
                .map(|w| w.into_iter().collect())
        }
        .map_err(|e| Error::external("loading model weights", e))?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config).map_err(|e| Error::external("building model", e))?;

        tracing::info!(hidden_size, "transformer backbone ready");
        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size: usize::try_from(hidden_size)
                .map_err(|e| Error::Configuration(format!("hidden_size: {e}")))?,
            pad_id,
        })
    }
}

impl Backbone for TransformerBackbone {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::external("tokenization", e))?;
        Ok(enc.get_ids().to_vec())
    }

    fn detokenize(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer.decode(ids, true).map_err(|e| Error::external("detokenization", e))
    }

    fn encode(&self, text: &str, max_len: usize, pad: bool) -> Result<(Tensor, Tensor)> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::external("tokenization", e))?;
        input_tensors(
            enc.get_ids().to_vec(),
            enc.get_attention_mask().to_vec(),
            max_len,
            pad.then_some(self.pad_id),
            &self.device,
        )
        .map_err(candle_err)
    }

    fn forward(&self, ids: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let token_type_ids = ids.zeros_like().map_err(candle_err)?;
        self.model.forward(ids, &token_type_ids, Some(mask)).map_err(candle_err)
    }
}
