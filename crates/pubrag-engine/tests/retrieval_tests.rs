use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pubrag_core::{
    ChunkPayload, Condition, DistinctValue, Embedder, EmbeddingRecord, Error, GroupingMode, IndexField,
    MetadataFilters, Result, SearchRequest, SearchResult, TokenCounter, VectorIndex,
};
use pubrag_engine::RetrievalEngine;
use pubrag_vector::MemoryIndex;

const DIM: usize = 4;

/// Maps every query onto the first axis, so a record's score is its first
/// vector component.
struct AxisEmbedder {
    dim: usize,
}

impl TokenCounter for AxisEmbedder {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

impl Embedder for AxisEmbedder {
    fn model_id(&self) -> &str {
        "pubmedbert"
    }
    fn dim(&self) -> usize {
        self.dim
    }
    fn max_len(&self) -> usize {
        512
    }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|_| {
                let mut v = vec![0.0; self.dim];
                v[0] = 1.0;
                v
            })
            .collect())
    }
}

/// Counts search calls on the wrapped index.
struct CountingIndex {
    inner: MemoryIndex,
    searches: AtomicUsize,
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn exists(&self) -> Result<bool> {
        self.inner.exists().await
    }
    async fn create(&self, dim: usize) -> Result<()> {
        self.inner.create(dim).await
    }
    async fn dimension(&self) -> Result<usize> {
        self.inner.dimension().await
    }
    async fn upsert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<usize> {
        self.inner.upsert_batch(records).await
    }
    async fn search_with_filters(
        &self,
        vector: &[f32],
        conditions: &[Condition],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search_with_filters(vector, conditions, limit).await
    }
    async fn delete_by_filter(&self, conditions: &[Condition]) -> Result<usize> {
        self.inner.delete_by_filter(conditions).await
    }
    async fn distinct_values(&self, field: IndexField, value: Option<&str>) -> Result<Vec<DistinctValue>> {
        self.inner.distinct_values(field, value).await
    }
    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

fn scored(score: f32) -> Vec<f32> {
    vec![score, (1.0 - score * score).max(0.0).sqrt(), 0.0, 0.0]
}

fn record(article: &str, n: u32, score: f32) -> EmbeddingRecord {
    let chunk_id = format!("{article}-{n}");
    EmbeddingRecord {
        vector: scored(score),
        payload: ChunkPayload {
            chunk_name: format!("{article}_chunk_{n}"),
            chunk_id,
            chunk_sequence: n,
            chunk_text: format!("chunk {n} of {article}"),
            article_id: article.into(),
            journal: "Nature".into(),
            year: Some(2010),
            embeddings_model: "pubmedbert".into(),
            ..Default::default()
        },
    }
}

fn request(top_k: usize, top_n: usize) -> SearchRequest {
    SearchRequest {
        query: "BRCA1 and breast cancer".into(),
        filters: MetadataFilters::default(),
        top_k,
        top_n,
        score_threshold: 0.0,
        embeddings_model: Some("pubmedbert".into()),
    }
}

async fn engine_with(records: Vec<EmbeddingRecord>) -> (RetrievalEngine, Arc<MemoryIndex>) {
    let index = Arc::new(MemoryIndex::with_dimension(DIM));
    index.upsert_batch(records).await.unwrap();
    let engine = RetrievalEngine::new(Arc::new(AxisEmbedder { dim: DIM }), index.clone());
    (engine, index)
}

fn five_articles() -> Vec<EmbeddingRecord> {
    let scores = [
        ("A", [0.99, 0.95, 0.60]),
        ("B", [0.98, 0.90, 0.85]),
        ("C", [0.97, 0.50, 0.40]),
        ("D", [0.96, 0.94, 0.93]),
        ("E", [0.80, 0.70, 0.65]),
    ];
    scores
        .iter()
        .flat_map(|(article, s)| s.iter().zip(1u32..).map(move |(score, n)| record(article, n, *score)))
        .collect()
}

#[tokio::test]
async fn diversity_caps_for_both_modes() {
    let (engine, _) = engine_with(five_articles()).await;

    let early = engine.search(&request(2, 3)).await.unwrap();
    assert_eq!(early.query, "BRCA1 and breast cancer");
    assert_eq!(early.results.iter().map(|a| a.article_id.as_str()).collect::<Vec<_>>(), ["A", "B", "C"]);
    assert_eq!(early.total_chunks(), 3, "early exit stops once the third article is admitted");

    let engine = engine.with_grouping(GroupingMode::GlobalSort);
    let global = engine.search(&request(2, 3)).await.unwrap();
    assert_eq!(global.results.len(), 3);
    assert!(global.results.iter().all(|a| a.chunks.len() <= 2));
    let a = global.article("A").unwrap();
    assert_eq!(a.chunks.iter().map(|c| c.chunk_id.as_str()).collect::<Vec<_>>(), ["A-1", "A-2"]);
    assert_eq!(global.article("B").unwrap().chunks.len(), 2);
    assert!(global.article("D").is_none());
}

#[tokio::test]
async fn native_filters_and_threshold() {
    let mut records = Vec::new();
    let mut n1 = record("N1", 1, 0.9);
    n1.payload.year = Some(2010);
    records.push(n1);
    let mut n2 = record("N2", 1, 0.65);
    n2.payload.year = Some(2008);
    records.push(n2);
    let mut n3 = record("N3", 1, 0.95);
    n3.payload.year = Some(2003);
    records.push(n3);
    let mut c1 = record("C1", 1, 0.99);
    c1.payload.journal = "Cell".into();
    c1.payload.year = Some(2012);
    records.push(c1);
    let (engine, _) = engine_with(records).await;

    let mut req = request(5, 5);
    req.filters.journal = Some("Nature".into());
    req.filters.years_after = Some(2005);
    req.score_threshold = 0.7;
    let response = engine.search(&req).await.unwrap();

    assert_eq!(response.results.len(), 1);
    let hit = &response.results[0].chunks[0];
    assert_eq!(hit.payload.article_id, "N1");
    assert_eq!(hit.payload.journal, "Nature");
    assert!(hit.payload.year.unwrap() > 2005);
    assert!(hit.score >= 0.7);
}

#[tokio::test]
async fn dimension_mismatch_is_caught_before_search() {
    let index = Arc::new(CountingIndex { inner: MemoryIndex::with_dimension(8), searches: AtomicUsize::new(0) });
    let engine = RetrievalEngine::new(Arc::new(AxisEmbedder { dim: DIM }), index.clone());
    let err = engine.search(&request(2, 3)).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 8, actual: DIM }));
    assert_eq!(index.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn request_validation() {
    let (engine, _) = engine_with(five_articles()).await;

    let mut other_model = request(2, 3);
    other_model.embeddings_model = Some("biobert".into());
    assert!(matches!(engine.search(&other_model).await, Err(Error::Configuration(_))));

    let mut no_model = request(2, 3);
    no_model.embeddings_model = None;
    assert!(engine.search(&no_model).await.is_ok());

    assert!(matches!(engine.search(&request(0, 3)).await, Err(Error::Validation(_))));

    let mut bad_date = request(2, 3);
    bad_date.filters.year_month = Some("2020-13".into());
    assert!(matches!(engine.search(&bad_date).await, Err(Error::Validation(_))));
}

#[tokio::test]
async fn missing_index_is_not_found() {
    let engine = RetrievalEngine::new(Arc::new(AxisEmbedder { dim: DIM }), Arc::new(MemoryIndex::new()));
    assert!(matches!(engine.search(&request(2, 3)).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn fuzzy_and_keyword_post_filters() {
    let mut brca = record("P1", 1, 0.9);
    brca.payload.title = "BRCA1 and breast cancer risk".into();
    brca.payload.authors = vec!["John Smith".into(), "Ana Lopez".into()];
    brca.payload.chunk_text = "BRCA1 mutations increase the risk of breast cancer".into();
    let mut smoke = record("P2", 1, 0.8);
    smoke.payload.title = "Tobacco smoke exposure in mice".into();
    smoke.payload.authors = vec!["Mei Chen".into()];
    smoke.payload.chunk_text = "Tobacco smoke exposure and lung cancer in mice".into();
    let (engine, _) = engine_with(vec![brca, smoke]).await;

    let only = |filters: MetadataFilters| {
        let mut req = request(3, 3);
        req.filters = filters;
        req
    };

    let by_title = engine
        .search(&only(MetadataFilters { title: Some("breast cancer risk".into()), ..Default::default() }))
        .await
        .unwrap();
    assert_eq!(by_title.results.iter().map(|a| a.article_id.as_str()).collect::<Vec<_>>(), ["P1"]);

    let by_author = engine
        .search(&only(MetadataFilters { authors: Some("Jon Smith".into()), ..Default::default() }))
        .await
        .unwrap();
    assert_eq!(by_author.results.iter().map(|a| a.article_id.as_str()).collect::<Vec<_>>(), ["P1"]);

    let by_keyword = engine
        .search(&only(MetadataFilters { keyword: Some("lung cancer".into()), ..Default::default() }))
        .await
        .unwrap();
    assert_eq!(by_keyword.results.iter().map(|a| a.article_id.as_str()).collect::<Vec<_>>(), ["P2"]);

    let strict = engine.with_fuzzy_threshold(100.0);
    let none = strict
        .search(&only(MetadataFilters { authors: Some("Jon Smith".into()), ..Default::default() }))
        .await
        .unwrap();
    assert!(none.results.is_empty());
}
