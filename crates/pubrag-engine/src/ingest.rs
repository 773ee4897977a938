use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use pubrag_core::bioconcept::BioconceptCounts;
use pubrag_core::config::Settings;
use pubrag_core::ids::{chunk_id, chunk_name};
use pubrag_core::types::DateParts;
use pubrag_core::{
    ChunkPayload, ChunkRecord, Chunker, Document, Embedder, EmbeddingRecord, Error, MergeStrategy,
    MergedChunk, Result, Storage, StorageExt, VectorIndex, WindowSizer,
};

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Documents chunked, embedded and handed to the index.
    pub processed: usize,
    pub skipped: usize,
    /// Records upserted into the index.
    pub written: usize,
    pub failures: Vec<IngestFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestFailure {
    pub path: String,
    pub error: String,
}

/// Text that gets embedded for a chunk: the article summary ahead of the
/// merged chunk text.
pub fn summary_prefixed(summary: &str, merged_text: &str) -> String {
    format!("Summary:\n{summary}\nText:\n{merged_text}")
}

/// Sync per-document work, shared by the blocking tasks of one run.
struct DocumentPipeline {
    storage: Arc<dyn Storage>,
    embedder: Arc<dyn Embedder>,
    sizer: WindowSizer,
    chunker: Chunker,
    merger: MergeStrategy,
    min_window_size: usize,
    summaries_dir: String,
    chunks_dir: String,
}

impl DocumentPipeline {
    fn process(&self, path: &str) -> Result<Vec<EmbeddingRecord>> {
        let mut document: Document = self.storage.read_json(path)?;
        if document.id.trim().is_empty() {
            return Err(Error::Validation(format!("document {path} has no id")));
        }
        document.resolve_identifiers();

        let summary = self.summary_for(&document)?;
        let window = self.window_for(&document.id, &summary)?;
        let chunks = self.chunker.resized(window)?.chunk(&document);
        if chunks.is_empty() {
            tracing::warn!(article_id = %document.id, "document produced no chunks");
            return Ok(Vec::new());
        }

        let merged: Vec<MergedChunk> = chunks.into_iter().map(|c| self.merger.merge_chunk(c)).collect();
        let texts: Vec<String> = merged.iter().map(|m| summary_prefixed(&summary, &m.merged_text)).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::ExternalService(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                texts.len()
            )));
        }

        let date = document.metadata.date_parts();
        let mut records = Vec::with_capacity(merged.len());
        let mut chunk_records = Vec::with_capacity(merged.len());
        for ((chunk, text), vector) in merged.iter().zip(texts).zip(vectors) {
            let token_count = self.embedder.count_tokens(&text)?;
            let payload = self.payload(&document, &summary, chunk, token_count, date);
            chunk_records.push(ChunkRecord { chunk_sequence: chunk.chunk.sequence, merged_text: text, payload: payload.clone() });
            records.push(EmbeddingRecord { vector, payload });
        }

        self.storage
            .write_json(&format!("{}/{}.json", self.chunks_dir, document.id), &chunk_records)?;
        tracing::debug!(article_id = %document.id, chunks = records.len(), window_size = window, "document embedded");
        Ok(records)
    }

    fn summary_for(&self, document: &Document) -> Result<String> {
        if let Some(summary) = document.summary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(summary.to_string());
        }
        let path = format!("{}/{}.txt", self.summaries_dir, document.id);
        if self.storage.exists(&path) {
            let summary = self.storage.read_to_string(&path)?;
            let summary = summary.trim();
            if !summary.is_empty() {
                return Ok(summary.to_string());
            }
        }
        Err(Error::Validation(format!("no summary for article {}", document.id)))
    }

    fn window_for(&self, article_id: &str, summary: &str) -> Result<usize> {
        let summary_tokens = self.embedder.count_tokens(summary)?;
        match self.sizer.window_size(summary_tokens) {
            Ok(window) if window >= self.min_window_size => Ok(window),
            Ok(window) => {
                tracing::warn!(article_id, window_size = window, min = self.min_window_size, "window below minimum");
                Ok(self.min_window_size)
            }
            Err(e) => {
                tracing::warn!(article_id, summary_tokens, error = %e, "summary leaves no room, using minimum window");
                Ok(self.min_window_size)
            }
        }
    }

    fn payload(
        &self,
        document: &Document,
        summary: &str,
        merged: &MergedChunk,
        token_count: usize,
        date: DateParts,
    ) -> ChunkPayload {
        let chunk = &merged.chunk;
        let meta = &document.metadata;
        let mut types: Vec<String> = Vec::new();
        for ann in &chunk.annotations {
            if !types.contains(&ann.entity_type) {
                types.push(ann.entity_type.clone());
            }
        }
        ChunkPayload {
            chunk_id: chunk_id(&document.id, chunk.strategy, chunk.sequence),
            chunk_name: chunk_name(&document.id, chunk.sequence),
            chunk_sequence: chunk.sequence,
            chunk_text: chunk.text.clone(),
            merged_text: merged.merged_text.clone(),
            chunk_length: chunk.char_len(),
            token_count,
            chunk_offset: chunk.offset,
            chunk_annotations_count: chunk.annotations.len(),
            chunk_annotations_ids: chunk.annotations.iter().map(|a| a.id.clone()).collect(),
            chunk_annotations_types: types,
            chunk_infons: chunk.infons.clone(),
            oversized: chunk.oversized,
            bioconcepts: BioconceptCounts::from_annotations(&chunk.annotations),
            article_id: document.id.clone(),
            article_summary: summary.to_string(),
            title: meta.title.clone(),
            journal: meta.journal.clone(),
            authors: meta.authors.clone(),
            article_type: meta.article_type.clone(),
            year: date.year,
            month: date.month,
            day: date.day,
            publication_date: meta.publication_date.clone(),
            identifiers: meta.identifiers.clone(),
            chunker_type: chunk.strategy.as_str().to_string(),
            merger_type: merged.merger.as_str().to_string(),
            embeddings_model: self.embedder.model_id().to_string(),
        }
    }
}

/// Chunks, merges, embeds and indexes a directory of annotated documents.
pub struct Ingestor {
    pipeline: Arc<DocumentPipeline>,
    index: Arc<dyn VectorIndex>,
    documents_dir: String,
    workers: usize,
    batch_size: usize,
    progress: bool,
}

impl Ingestor {
    pub fn new(
        settings: &Settings,
        storage: Arc<dyn Storage>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        let chunking = &settings.chunking;
        let sizer = WindowSizer::new(chunking.model_capacity, chunking.buffer_fraction)?;
        let chunker = Chunker::new(chunking.strategy, chunking.min_window_size.max(1))?
            .with_excluded_passage_types(&chunking.excluded_passage_types)?;
        let pipeline = DocumentPipeline {
            storage,
            embedder,
            sizer,
            chunker,
            merger: settings.merging.strategy,
            min_window_size: chunking.min_window_size.max(1),
            summaries_dir: settings.storage.summaries_dir.clone(),
            chunks_dir: settings.storage.chunks_dir.clone(),
        };
        Ok(Self {
            pipeline: Arc::new(pipeline),
            index,
            documents_dir: settings.storage.documents_dir.clone(),
            workers: settings.ingest.workers.max(1),
            batch_size: settings.ingest.batch_size.max(1),
            progress: false,
        })
    }

    /// Draw an indicatif bar while documents are processed.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn with_documents_dir(mut self, dir: impl Into<String>) -> Self {
        self.documents_dir = dir.into();
        self
    }

    pub async fn run(&self) -> Result<IngestReport> {
        if !self.index.exists().await? {
            return Err(Error::NotFound(
                "vector index does not exist; create it before ingesting".into(),
            ));
        }
        let expected = self.index.dimension().await?;
        let actual = self.pipeline.embedder.dim();
        if expected != actual {
            return Err(Error::DimensionMismatch { expected, actual });
        }

        let paths = self.pipeline.storage.list(&self.documents_dir, Some("json"))?;
        tracing::info!(documents = paths.len(), dir = %self.documents_dir, workers = self.workers, "ingestion started");

        let pb = if self.progress { ProgressBar::new(paths.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        let mut outcomes = stream::iter(paths)
            .map(|path| {
                let pipeline = Arc::clone(&self.pipeline);
                async move {
                    let task_path = path.clone();
                    let outcome = tokio::task::spawn_blocking(move || pipeline.process(&task_path))
                        .await
                        .map_err(|e| Error::external("ingest task", e))
                        .and_then(|r| r);
                    (path, outcome)
                }
            })
            .buffer_unordered(self.workers);

        let mut report = IngestReport::default();
        let mut pending: Vec<EmbeddingRecord> = Vec::new();
        while let Some((path, outcome)) = outcomes.next().await {
            pb.inc(1);
            match outcome {
                Ok(records) => {
                    report.processed += 1;
                    pending.extend(records);
                    if pending.len() >= self.batch_size {
                        self.flush(&mut pending, &mut report).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(document = %path, error = %e, "skipping document");
                    report.skipped += 1;
                    report.failures.push(IngestFailure { path, error: e.to_string() });
                }
            }
            pb.set_message(format!("{} records written", report.written));
        }
        self.flush(&mut pending, &mut report).await;
        pb.finish_with_message(format!("{} records written", report.written));

        tracing::info!(
            processed = report.processed,
            skipped = report.skipped,
            written = report.written,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Upsert the pending records, retrying once. A batch that still fails
    /// is recorded in the report and the run carries on.
    async fn flush(&self, pending: &mut Vec<EmbeddingRecord>, report: &mut IngestReport) {
        if pending.is_empty() {
            return;
        }
        let batch = std::mem::take(pending);
        let size = batch.len();
        let result = match self.index.upsert_batch(batch.clone()).await {
            Ok(written) => Ok(written),
            Err(e) => {
                tracing::warn!(records = size, error = %e, "upsert failed, retrying batch");
                self.index.upsert_batch(batch).await
            }
        };
        match result {
            Ok(written) => {
                tracing::debug!(written, "upserted batch");
                report.written += written;
            }
            Err(e) => {
                tracing::error!(records = size, error = %e, "dropping batch after retry");
                report.failures.push(IngestFailure { path: format!("upsert batch ({size} records)"), error: e.to_string() });
            }
        }
    }
}
