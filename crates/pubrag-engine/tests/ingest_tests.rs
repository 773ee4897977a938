use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pubrag_core::config::Settings;
use pubrag_core::{
    ChunkRecord, ChunkStrategy, Condition, DistinctValue, Embedder, EmbeddingRecord, Error, IndexField, LocalStorage,
    Result, SearchRequest, SearchResult, Storage, StorageExt, VectorIndex,
};
use pubrag_embed::{HashBackbone, ModelRegistry, WindowedEmbedder};
use pubrag_engine::{Ingestor, RetrievalEngine};
use pubrag_vector::MemoryIndex;
use serde_json::json;
use tempfile::TempDir;

const DIM: usize = 16;

fn embedder() -> Arc<dyn Embedder> {
    let spec = ModelRegistry::builtin().resolve("pubmedbert").unwrap().clone();
    Arc::new(WindowedEmbedder::new(spec, HashBackbone::new(DIM).unwrap()))
}

fn article(id: &str, journal: &str, summary: Option<&str>) -> serde_json::Value {
    let title = "BRCA1 mutations and breast cancer risk";
    let body = "BRCA1 mutations increase the risk of breast cancer in carriers.";
    json!({
        "id": id,
        "infons": { "source": "PMC" },
        "metadata": {
            "title": title,
            "journal": journal,
            "authors": ["John Smith", "Ana Lopez"],
            "article_type": "research-article",
            "publication_date": "2010-04-12",
            "identifiers": { "pmid": "12345" }
        },
        "summary": summary,
        "passages": [
            {
                "text": title,
                "offset": 0,
                "infons": { "type": "front" },
                "annotations": [
                    { "id": "a1", "text": "BRCA1", "type": "Gene", "ontology_label": "NCBI Gene", "ontology_id": "672", "offset": 0, "length": 5 }
                ]
            },
            {
                "text": body,
                "offset": 39,
                "infons": { "type": "paragraph" },
                "annotations": [
                    { "id": "a2", "text": "breast cancer", "type": "Disease", "ontology_label": "MESH", "ontology_id": "D001943", "offset": 76, "length": 13 }
                ]
            },
            {
                "text": "We thank the funding agencies.",
                "offset": 104,
                "infons": { "type": "acknowledge" },
                "annotations": []
            }
        ]
    })
}

struct Fixture {
    _tmp: TempDir,
    storage: Arc<LocalStorage>,
    settings: Settings,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(tmp.path()));
    let mut settings = Settings::default();
    settings.chunking.strategy = ChunkStrategy::SlidingWindow;
    settings.ingest.workers = 2;
    settings.ingest.batch_size = 3;

    storage.write_json("documents/PMC1.json", &article("PMC1", "Nature", Some("Carriers of BRCA1 variants."))).unwrap();
    storage.write_json("documents/PMC2.json", &article("PMC2", "Cell", None)).unwrap();
    storage.write("summaries/PMC2.txt", b"Breast cancer risk in BRCA1 carriers.\n").unwrap();
    storage.write("documents/broken.json", b"{ not json").unwrap();
    storage.write_json("documents/PMC3.json", &article("PMC3", "Nature", None)).unwrap();
    Fixture { _tmp: tmp, storage, settings }
}

#[tokio::test]
async fn ingest_skips_bad_documents_and_indexes_the_rest() {
    let fx = fixture();
    let index = Arc::new(MemoryIndex::with_dimension(DIM));
    let ingestor = Ingestor::new(&fx.settings, fx.storage.clone(), embedder(), index.clone()).unwrap();

    let report = ingestor.run().await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped, 2, "malformed JSON and missing summary");
    assert_eq!(report.written, 4, "two non-excluded passages per article");
    let mut failed: Vec<&str> = report.failures.iter().map(|f| f.path.as_str()).collect();
    failed.sort_unstable();
    assert_eq!(failed, ["documents/PMC3.json", "documents/broken.json"]);
    assert_eq!(index.count().await.unwrap(), 4);

    let records: Vec<ChunkRecord> = fx.storage.read_json("chunks/PMC1.json").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().map(|r| r.chunk_sequence).collect::<Vec<_>>(), [1, 2]);
    let second = &records[1];
    assert!(second.merged_text.starts_with("Summary:\nCarriers of BRCA1 variants.\nText:\n"));
    assert!(second.merged_text.ends_with(&second.payload.merged_text));
    assert_eq!(second.payload.chunk_name, "PMC1_chunk_2");
    assert_eq!(second.payload.chunk_annotations_ids, ["a2"]);
    assert_eq!(second.payload.chunk_annotations_types, ["Disease"]);
    assert_eq!(second.payload.bioconcepts.diseases, 1);
    assert_eq!(second.payload.year, Some(2010));
    assert_eq!(second.payload.month, Some(4));
    assert_eq!(second.payload.chunk_infons.get("source").map(String::as_str), Some("PMC"));
    assert_eq!(second.payload.embeddings_model, "pubmedbert");
    assert!(second.payload.token_count > 0);

    let from_file: Vec<ChunkRecord> = fx.storage.read_json("chunks/PMC2.json").unwrap();
    assert_eq!(from_file[0].payload.article_summary, "Breast cancer risk in BRCA1 carriers.");
}

#[tokio::test]
async fn reingesting_overwrites_by_chunk_id() {
    let fx = fixture();
    let index = Arc::new(MemoryIndex::with_dimension(DIM));
    let ingestor = Ingestor::new(&fx.settings, fx.storage.clone(), embedder(), index.clone()).unwrap();
    ingestor.run().await.unwrap();
    ingestor.run().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 4);
}

#[tokio::test]
async fn missing_index_aborts_before_any_document() {
    let fx = fixture();
    let index = Arc::new(MemoryIndex::new());
    let ingestor = Ingestor::new(&fx.settings, fx.storage.clone(), embedder(), index.clone()).unwrap();
    assert!(matches!(ingestor.run().await, Err(Error::NotFound(_))));
    assert!(!index.exists().await.unwrap());
    assert!(!fx.storage.exists("chunks/PMC1.json"));
}

#[tokio::test]
async fn index_dimension_must_match_embedder() {
    let fx = fixture();
    let index = Arc::new(MemoryIndex::with_dimension(DIM * 2));
    let ingestor = Ingestor::new(&fx.settings, fx.storage.clone(), embedder(), index).unwrap();
    assert!(matches!(
        ingestor.run().await,
        Err(Error::DimensionMismatch { expected, actual }) if expected == DIM * 2 && actual == DIM
    ));
}

#[tokio::test]
async fn ingested_chunks_are_retrievable() {
    let fx = fixture();
    let index = Arc::new(MemoryIndex::with_dimension(DIM));
    let embedder = embedder();
    Ingestor::new(&fx.settings, fx.storage.clone(), embedder.clone(), index.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let engine = RetrievalEngine::from_settings(&fx.settings.retrieval, embedder, index);
    let mut filters = pubrag_core::MetadataFilters::default();
    filters.journal = Some("Nature".into());
    let response = engine
        .search(&SearchRequest {
            query: "BRCA1 breast cancer".into(),
            filters,
            top_k: 2,
            top_n: 3,
            score_threshold: -1.0,
            embeddings_model: Some("pubmedbert".into()),
        })
        .await
        .unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].article_id, "PMC1");
    assert_eq!(response.results[0].chunks.len(), 2);
}

/// Memory index whose first `failures` upserts return an error.
struct FlakyIndex {
    inner: MemoryIndex,
    failures: usize,
    attempts: AtomicUsize,
}

impl FlakyIndex {
    fn new(failures: usize) -> Self {
        Self { inner: MemoryIndex::with_dimension(DIM), failures, attempts: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
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
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(Error::ExternalService("table is locked".into()));
        }
        self.inner.upsert_batch(records).await
    }
    async fn search_with_filters(
        &self,
        vector: &[f32],
        conditions: &[Condition],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
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

#[tokio::test]
async fn transient_upsert_failure_is_retried() {
    let mut fx = fixture();
    fx.settings.ingest.batch_size = 100;
    let index = Arc::new(FlakyIndex::new(1));
    let report = Ingestor::new(&fx.settings, fx.storage.clone(), embedder(), index.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.written, 4);
    assert_eq!(index.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(index.count().await.unwrap(), 4);
    assert!(report.failures.iter().all(|f| f.path.starts_with("documents/")));
}

#[tokio::test]
async fn persistent_upsert_failure_is_reported_not_fatal() {
    let mut fx = fixture();
    fx.settings.ingest.batch_size = 100;
    let index = Arc::new(FlakyIndex::new(usize::MAX));
    let report = Ingestor::new(&fx.settings, fx.storage.clone(), embedder(), index.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.written, 0);
    assert_eq!(index.attempts.load(Ordering::SeqCst), 2, "one attempt plus one retry");
    let batch_failures: Vec<_> = report.failures.iter().filter(|f| f.path.starts_with("upsert batch")).collect();
    assert_eq!(batch_failures.len(), 1);
    assert_eq!(batch_failures[0].path, "upsert batch (4 records)");
    assert!(batch_failures[0].error.contains("table is locked"));
    assert_eq!(index.count().await.unwrap(), 0);
}
