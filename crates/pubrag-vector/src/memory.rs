use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use pubrag_core::filter::matches_all;
use pubrag_core::{
    Condition, DistinctValue, EmbeddingRecord, Error, IndexField, Result, SearchResult, VectorIndex,
};

use crate::convert::validate_record;

struct State {
    dim: usize,
    /// Insertion order is the scan order; an upsert keeps the slot.
    records: Vec<EmbeddingRecord>,
}

/// In-process index with exact cosine search. Same contract as the LanceDB
/// backend; used by tests and small local runs.
#[derive(Default)]
pub struct MemoryIndex {
    state: RwLock<Option<State>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A memory index that already exists with `dim`.
    pub fn with_dimension(dim: usize) -> Self {
        Self { state: RwLock::new(Some(State { dim, records: Vec::new() })) }
    }
}

fn missing() -> Error {
    Error::NotFound("in-memory index".into())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut a_norm = 0.0f32;
    let mut b_norm = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    dot / (a_norm.sqrt() * b_norm.sqrt())
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn exists(&self) -> Result<bool> {
        Ok(self.state.read().await.is_some())
    }

    async fn create(&self, dim: usize) -> Result<()> {
        if dim == 0 {
            return Err(Error::Configuration("index dimension must be positive".into()));
        }
        let mut guard = self.state.write().await;
        if guard.is_some() {
            return Err(Error::Configuration("in-memory index already exists".into()));
        }
        *guard = Some(State { dim, records: Vec::new() });
        Ok(())
    }

    async fn dimension(&self) -> Result<usize> {
        self.state.read().await.as_ref().map(|s| s.dim).ok_or_else(missing)
    }

    async fn upsert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<usize> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or_else(missing)?;
        for record in &records {
            validate_record(record, state.dim)?;
        }
        let written = records.len();
        for record in records {
            match state.records.iter_mut().find(|r| r.chunk_id() == record.chunk_id()) {
                Some(slot) => *slot = record,
                None => state.records.push(record),
            }
        }
        Ok(written)
    }

    async fn search_with_filters(
        &self,
        vector: &[f32],
        conditions: &[Condition],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or_else(missing)?;
        if vector.len() != state.dim {
            return Err(Error::DimensionMismatch { expected: state.dim, actual: vector.len() });
        }
        for c in conditions {
            c.validate()?;
        }
        let mut hits: Vec<SearchResult> = state
            .records
            .iter()
            .filter(|r| matches_all(conditions, &r.payload))
            .map(|r| SearchResult {
                chunk_id: r.payload.chunk_id.clone(),
                score: cosine_similarity(vector, &r.vector),
                payload: r.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_by_filter(&self, conditions: &[Condition]) -> Result<usize> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or_else(missing)?;
        if conditions.is_empty() {
            return Err(Error::Validation("refusing to delete without conditions".into()));
        }
        for c in conditions {
            c.validate()?;
        }
        let before = state.records.len();
        state.records.retain(|r| !matches_all(conditions, &r.payload));
        Ok(before - state.records.len())
    }

    async fn distinct_values(&self, field: IndexField, value: Option<&str>) -> Result<Vec<DistinctValue>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or_else(missing)?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in &state.records {
            let Some(v) = field.value_of(&record.payload).map(|v| v.to_string()) else {
                continue;
            };
            if value.is_some_and(|wanted| wanted != v) {
                continue;
            }
            *counts.entry(v).or_default() += 1;
        }
        Ok(crate::sorted_distinct(counts))
    }

    async fn count(&self) -> Result<usize> {
        self.state.read().await.as_ref().map(|s| s.records.len()).ok_or_else(missing)
    }
}
