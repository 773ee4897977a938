//! Shared domain model for the pubrag workspace: documents, chunking,
//! annotation merging, metadata filters, configuration and the traits the
//! embedding and index backends implement.

pub mod bioconcept;
pub mod chunking;
pub mod config;
pub mod error;
pub mod filter;
pub mod ids;
pub mod merger;
pub mod storage;
pub mod traits;
pub mod types;
pub mod window;

pub use chunking::{ChunkStrategy, Chunker};
pub use config::{expand_path, Config, GroupingMode, Settings};
pub use error::{Error, Result};
pub use filter::{Condition, FilterOp, FilterValue, IndexField};
pub use merger::MergeStrategy;
pub use storage::{LocalStorage, Storage, StorageExt};
pub use traits::{Embedder, TokenCounter, VectorIndex};
pub use types::*;
pub use window::WindowSizer;
