//! Domain types shared by chunking, embedding, indexing and retrieval.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bioconcept::BioconceptCounts;
use crate::chunking::ChunkStrategy;
use crate::merger::MergeStrategy;

pub type ChunkId = String;
pub type Infons = BTreeMap<String, String>;

/// Bibliographic metadata carried alongside an annotated document.
///
/// `publication_date` accepts `YYYY`, `YYYY-MM` or `YYYY-MM-DD`; the parts
/// are derived on demand through [`ArticleMetadata::date_parts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub article_type: String,
    #[serde(default)]
    pub publication_date: Option<String>,
    /// External identifiers such as `pmid`, `pmcid` or `doi`.
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateParts {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl ArticleMetadata {
    pub fn date_parts(&self) -> DateParts {
        let Some(raw) = self.publication_date.as_deref().map(str::trim) else {
            return DateParts::default();
        };
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return DateParts { year: Some(date.year()), month: Some(date.month()), day: Some(date.day()) };
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
            return DateParts { year: Some(date.year()), month: Some(date.month()), day: None };
        }
        match raw.parse::<i32>() {
            Ok(year) => DateParts { year: Some(year), month: None, day: None },
            Err(_) => {
                tracing::debug!(publication_date = raw, "unparseable publication date");
                DateParts::default()
            }
        }
    }
}

/// A recognized entity span. Offsets and lengths count characters and are
/// absolute within the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub ontology_label: String,
    #[serde(default)]
    pub ontology_id: String,
    pub offset: usize,
    pub length: usize,
    /// Raw annotator infons, used to resolve a missing label/id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub infons: Infons,
}

impl Annotation {
    pub fn new(
        text: impl Into<String>,
        entity_type: impl Into<String>,
        ontology_label: impl Into<String>,
        ontology_id: impl Into<String>,
        offset: usize,
        length: usize,
    ) -> Self {
        Self {
            id: String::new(),
            text: text.into(),
            entity_type: entity_type.into(),
            ontology_label: ontology_label.into(),
            ontology_id: ontology_id.into(),
            offset,
            length,
            infons: Infons::new(),
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Dedup key: two annotations with equal keys merge identically.
    pub fn identity_key(&self) -> (&str, &str, &str, &str) {
        (&self.text, &self.entity_type, &self.ontology_label, &self.ontology_id)
    }

    /// True when the span `[start, end)` overlaps the annotation at all,
    /// including a span lying strictly inside it.
    pub fn intersects(&self, start: usize, end: usize) -> bool {
        if self.length == 0 {
            return start <= self.offset && self.offset < end;
        }
        self.offset < end && start < self.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub offset: usize,
    #[serde(default)]
    pub infons: Infons,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Passage {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn end(&self) -> usize {
        self.offset + self.char_len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub passages: Vec<Passage>,
    #[serde(default)]
    pub infons: Infons,
    #[serde(default)]
    pub metadata: ArticleMetadata,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Document {
    /// Fill missing ontology label/id on every annotation from its raw infons.
    pub fn resolve_identifiers(&mut self) {
        for passage in &mut self.passages {
            for ann in &mut passage.annotations {
                crate::bioconcept::resolve_identifier(ann);
            }
        }
    }
}

/// Minimal retrievable unit of document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub sequence: u32,
    pub text: String,
    pub offset: usize,
    pub annotations: Vec<Annotation>,
    pub infons: Infons,
    pub strategy: ChunkStrategy,
    /// Set when an annotation longer than the window forced a larger chunk.
    #[serde(default)]
    pub oversized: bool,
    /// Entity type the chunk was grouped under (grouped strategy only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_type: Option<String>,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub merged_text: String,
    pub merger: MergeStrategy,
}

/// Denormalized record stored next to each vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub chunk_id: ChunkId,
    pub chunk_name: String,
    pub chunk_sequence: u32,
    pub chunk_text: String,
    pub merged_text: String,
    pub chunk_length: usize,
    pub token_count: usize,
    pub chunk_offset: usize,
    pub chunk_annotations_count: usize,
    #[serde(default)]
    pub chunk_annotations_ids: Vec<String>,
    #[serde(default)]
    pub chunk_annotations_types: Vec<String>,
    #[serde(default)]
    pub chunk_infons: Infons,
    #[serde(default)]
    pub oversized: bool,
    #[serde(flatten)]
    pub bioconcepts: BioconceptCounts,
    pub article_id: String,
    #[serde(default)]
    pub article_summary: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub article_type: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
    pub chunker_type: String,
    pub merger_type: String,
    pub embeddings_model: String,
}

/// One vector-index entry, keyed by `payload.chunk_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl EmbeddingRecord {
    pub fn chunk_id(&self) -> &str {
        &self.payload.chunk_id
    }
}

/// Chunk details persisted per article after ingestion. `merged_text` here
/// is the summary-prefixed text that was embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_sequence: u32,
    pub merged_text: String,
    pub payload: ChunkPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: ChunkId,
    /// Cosine similarity; higher is better.
    pub score: f32,
    pub payload: ChunkPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinctValue {
    pub value: String,
    pub count: usize,
}

/// Metadata filters accepted by the retrieval engine.
///
/// `journal`, `article_type`, `year`, `years_after`, `years_before`, `date`
/// and `year_month` are evaluated natively by the index; `title`, `authors`
/// and `keyword` are evaluated by the engine over the candidate list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilters {
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub article_type: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub years_after: Option<i32>,
    #[serde(default)]
    pub years_before: Option<i32>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,
    /// `YYYY-MM`
    #[serde(default)]
    pub year_month: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub filters: MetadataFilters,
    pub top_k: usize,
    pub top_n: usize,
    #[serde(default)]
    pub score_threshold: f32,
    /// Must name the model the index was built with; `None` uses the engine's.
    #[serde(default)]
    pub embeddings_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleResults {
    pub article_id: String,
    pub chunks: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub query: String,
    /// Articles in admission order, each with its chunks ranked by score.
    pub results: Vec<ArticleResults>,
}

impl RetrievalResponse {
    pub fn article(&self, article_id: &str) -> Option<&ArticleResults> {
        self.results.iter().find(|a| a.article_id == article_id)
    }

    pub fn total_chunks(&self) -> usize {
        self.results.iter().map(|a| a.chunks.len()).sum()
    }
}
