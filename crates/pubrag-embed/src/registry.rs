use std::collections::BTreeMap;

use pubrag_core::config::ModelEntry;
use pubrag_core::{Error, Result};

/// A named embedding model and its context length in tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub id: String,
    /// Pretrained model reference the local weights were exported from.
    pub reference: String,
    pub max_len: usize,
    /// Whether the BERT backbone can load the weights. Models without it
    /// are known for their context length but only run on hash embeddings.
    pub bert_compatible: bool,
}

/// Built-in models. `bio_gpt`, `longformer` and `big_bird` are not BERT
/// architectures; they resolve for sizing and hash embeddings, and
/// `build_embedder` rejects them for real inference.
const BUILTIN: &[(&str, &str, usize, bool)] = &[
    ("bio_bert", "dmis-lab/biobert-v1.1", 512, true),
    ("sci_bert", "allenai/scibert_scivocab_uncased", 512, true),
    ("pubmedbert", "NeuML/pubmedbert-base-embeddings", 512, true),
    ("medembed", "abhinand/MedEmbed-base-v0.1", 512, true),
    ("bio_gpt", "microsoft/biogpt", 1024, false),
    ("longformer", "allenai/longformer-base-4096", 4096, false),
    ("big_bird", "google/bigbird-roberta-base", 4096, false),
];

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRegistry {
    pub fn builtin() -> Self {
        let models = BUILTIN
            .iter()
            .map(|&(id, reference, max_len, bert_compatible)| {
                let spec = ModelSpec { id: id.to_string(), reference: reference.to_string(), max_len, bert_compatible };
                (id.to_string(), spec)
            })
            .collect();
        Self { models }
    }

    /// Register configured models; an entry with a built-in id replaces it.
    /// Configured models are expected to be BERT exports.
    pub fn with_extra(mut self, extra: &BTreeMap<String, ModelEntry>) -> Self {
        for (id, entry) in extra {
            self.models.insert(
                id.clone(),
                ModelSpec {
                    id: id.clone(),
                    reference: entry.reference.clone(),
                    max_len: entry.max_len,
                    bert_compatible: true,
                },
            );
        }
        self
    }

    pub fn resolve(&self, id: &str) -> Result<&ModelSpec> {
        let spec = self.models.get(id).ok_or_else(|| {
            Error::Configuration(format!(
                "unknown embeddings model '{id}', expected one of: {}",
                self.ids().collect::<Vec<_>>().join(", ")
            ))
        })?;
        if spec.max_len == 0 {
            return Err(Error::Configuration(format!("model '{id}' has a zero max length")));
        }
        Ok(spec)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}
