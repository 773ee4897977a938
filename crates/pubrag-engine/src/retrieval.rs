use std::sync::Arc;

use pubrag_core::config::RetrievalSettings;
use pubrag_core::{Embedder, Error, GroupingMode, Result, RetrievalResponse, SearchRequest, VectorIndex};

use crate::grouping::group_by_article;
use crate::postfilter::apply_post_filters;

/// Candidates requested from the index for one query. The oversample holds
/// `top_n` articles with `top_k` chunks each, twice over.
pub fn candidate_limit(top_k: usize, top_n: usize) -> usize {
    (top_k * 2).max(top_k * top_n * 2)
}

/// Answers semantic queries: embed, pre-filter in the index, post-filter,
/// threshold and group by article.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    fuzzy_threshold: f64,
    grouping: GroupingMode,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        let defaults = RetrievalSettings::default();
        Self { embedder, index, fuzzy_threshold: defaults.fuzzy_threshold, grouping: defaults.grouping }
    }

    pub fn from_settings(
        settings: &RetrievalSettings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self::new(embedder, index)
            .with_fuzzy_threshold(settings.fuzzy_threshold)
            .with_grouping(settings.grouping)
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_grouping(mut self, grouping: GroupingMode) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn grouping(&self) -> GroupingMode {
        self.grouping
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<RetrievalResponse> {
        if let Some(model) = request.embeddings_model.as_deref() {
            if model != self.embedder.model_id() {
                return Err(Error::Configuration(format!(
                    "query model '{model}' does not match engine model '{}'",
                    self.embedder.model_id()
                )));
            }
        }
        if request.top_k == 0 || request.top_n == 0 {
            return Err(Error::Validation("top_k and top_n must be positive".into()));
        }
        let conditions = request.filters.native_conditions()?;

        let embedder = Arc::clone(&self.embedder);
        let query = request.query.clone();
        let vector = tokio::task::spawn_blocking(move || embedder.embed_batch(&[query]))
            .await
            .map_err(|e| Error::external("query embedding task", e))??
            .into_iter()
            .next()
            .ok_or_else(|| Error::ExternalService("embedder returned no vector".into()))?;

        let expected = self.index.dimension().await?;
        if vector.len() != expected {
            return Err(Error::DimensionMismatch { expected, actual: vector.len() });
        }

        let limit = candidate_limit(request.top_k, request.top_n);
        let candidates = self.index.search_with_filters(&vector, &conditions, limit).await?;
        let fetched = candidates.len();

        let mut survivors = apply_post_filters(candidates, &request.filters, self.fuzzy_threshold)?;
        survivors.retain(|c| c.score >= request.score_threshold);

        let results = group_by_article(survivors, request.top_k, request.top_n, self.grouping);
        tracing::info!(
            query = %request.query,
            conditions = conditions.len(),
            limit,
            fetched,
            articles = results.len(),
            "retrieval finished"
        );
        Ok(RetrievalResponse { query: request.query.clone(), results })
    }
}
