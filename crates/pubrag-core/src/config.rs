//! Configuration loader and path helpers.
//!
//! Figment merges `config.toml`, then `config.<env>.toml` (selected by
//! `RUST_ENV`), then `PUBRAG_*` environment variables, where `__` separates
//! nested keys (`PUBRAG_RETRIEVAL__TOP_K=10`). The result is extracted into a
//! typed [`Settings`] that callers build once and pass around.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::chunking::ChunkStrategy;
use crate::error::{Error, Result};
use crate::merger::MergeStrategy;

pub const ENV_PREFIX: &str = "PUBRAG_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub chunking: ChunkingSettings,
    pub merging: MergingSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub root: String,
    pub documents_dir: String,
    pub summaries_dir: String,
    pub chunks_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: "./data".into(),
            documents_dir: "documents".into(),
            summaries_dir: "summaries".into(),
            chunks_dir: "chunks".into(),
        }
    }
}

impl StorageSettings {
    pub fn root_path(&self) -> PathBuf {
        expand_path(&self.root)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingSettings {
    pub strategy: ChunkStrategy,
    pub model_capacity: usize,
    pub buffer_fraction: f64,
    pub min_window_size: usize,
    pub excluded_passage_types: Vec<String>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            model_capacity: 512,
            buffer_fraction: crate::window::DEFAULT_BUFFER_FRACTION,
            min_window_size: 64,
            excluded_passage_types: vec!["acknowledge.*".into()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergingSettings {
    pub strategy: MergeStrategy,
}

/// A model registered on top of the built-in table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelEntry {
    pub reference: String,
    pub max_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub fake_dim: usize,
    pub extra_models: BTreeMap<String, ModelEntry>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "pubmedbert".into(),
            model_dir: None,
            use_fake: false,
            fake_dim: 768,
            extra_models: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexSettings {
    pub uri: String,
    pub table: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { uri: "./data/lancedb".into(), table: "chunks".into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Scan candidates in index order and stop once `top_n` articles are in.
    #[default]
    EarlyExit,
    /// Rank every survivor by score before grouping.
    GlobalSort,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub top_n: usize,
    pub score_threshold: f32,
    pub fuzzy_threshold: f64,
    pub grouping: GroupingMode,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5, top_n: 3, score_threshold: 0.0, fuzzy_threshold: 70.0, grouping: GroupingMode::EarlyExit }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestSettings {
    pub workers: usize,
    pub batch_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self { workers: workers.max(1), batch_size: 64 }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        tracing::debug!(env = %env_name, dir = %dir.display(), "configuration sources merged");
        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.chunking.buffer_fraction) {
            return Err(Error::Configuration(format!(
                "chunking.buffer_fraction must be in [0, 1), got {}",
                self.chunking.buffer_fraction
            )));
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_n == 0 {
            return Err(Error::Configuration("retrieval.top_k and retrieval.top_n must be positive".into()));
        }
        if self.ingest.workers == 0 {
            return Err(Error::Configuration("ingest.workers must be positive".into()));
        }
        Ok(())
    }
}

/// Expand `~` and `$VAR`/`${VAR}` in a configured path. Unknown variables
/// are left as written.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let with_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}
