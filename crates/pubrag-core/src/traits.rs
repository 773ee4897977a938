use async_trait::async_trait;

use crate::error::Result;
use crate::filter::{Condition, IndexField};
use crate::types::{DistinctValue, EmbeddingRecord, SearchResult};

pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

/// Turns text into fixed-size, L2-normalized vectors.
pub trait Embedder: TokenCounter {
    /// Registry identifier of the loaded model (e.g. `pubmedbert`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// One vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Vector index keyed by `chunk_id`.
///
/// Only `exists` and `create` may be called on a missing index; everything
/// else fails with `Error::NotFound`. Indexes are never created implicitly.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn exists(&self) -> Result<bool>;
    /// Explicit administrative creation with the given vector dimension.
    async fn create(&self, dim: usize) -> Result<()>;
    /// Declared vector dimension of the index.
    async fn dimension(&self) -> Result<usize>;
    async fn upsert(&self, record: EmbeddingRecord) -> Result<()> {
        self.upsert_batch(vec![record]).await.map(|_| ())
    }
    async fn upsert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<usize>;
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_filters(vector, &[], limit).await
    }
    /// Pre-filtered KNN; results are ordered by descending score.
    async fn search_with_filters(
        &self,
        vector: &[f32],
        conditions: &[Condition],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;
    /// Returns the number of deleted records.
    async fn delete_by_filter(&self, conditions: &[Condition]) -> Result<usize>;
    /// Distinct values of `field` with their record counts, most frequent
    /// first; `value` narrows the result to that single value.
    async fn distinct_values(&self, field: IndexField, value: Option<&str>) -> Result<Vec<DistinctValue>>;
    async fn count(&self) -> Result<usize>;
}
