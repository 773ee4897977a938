//! Text embedding: model registry, transformer and hash backbones, and the
//! windowed masked-mean embedder that turns either into a [`pubrag_core::Embedder`].

use std::sync::Arc;

use pubrag_core::config::{expand_path, EmbeddingSettings};
use pubrag_core::{Embedder, Error, Result};

pub mod backbone;
pub mod bert;
pub mod device;
pub mod hash;
pub mod pool;
pub mod registry;
pub mod tokenize;
pub mod windowed;

pub use backbone::Backbone;
pub use bert::TransformerBackbone;
pub use hash::HashBackbone;
pub use pool::masked_mean_l2;
pub use registry::{ModelRegistry, ModelSpec};
pub use windowed::{token_windows, WindowedEmbedder};

pub const FAKE_EMBEDDINGS_ENV: &str = "PUBRAG_USE_FAKE_EMBEDDINGS";

fn fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.use_fake
        || std::env::var(FAKE_EMBEDDINGS_ENV)
            .ok()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build the configured embedder. The model id must be registered even for
/// the hash backbone so that payloads always name a known model.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let registry = ModelRegistry::builtin().with_extra(&settings.extra_models);
    let spec = registry.resolve(&settings.model)?.clone();

    if fake_requested(settings) {
        tracing::info!(model = %spec.id, dim = settings.fake_dim, "using hash embeddings");
        let backbone = HashBackbone::new(settings.fake_dim)?;
        return Ok(Arc::new(WindowedEmbedder::new(spec, backbone)));
    }

    if !spec.bert_compatible {
        return Err(Error::Configuration(format!(
            "model '{}' ({}) is not a BERT architecture and cannot be loaded; use a BERT model or fake embeddings",
            spec.id, spec.reference
        )));
    }
    let model_dir = settings
        .model_dir
        .as_deref()
        .map(expand_path)
        .ok_or_else(|| Error::Configuration(format!("embedding.model_dir is required for model '{}'", spec.id)))?;
    let backbone = TransformerBackbone::load(&model_dir, device::select_device())?;
    tracing::info!(model = %spec.id, reference = %spec.reference, max_len = spec.max_len, "embedder ready");
    Ok(Arc::new(WindowedEmbedder::new(spec, backbone)))
}
