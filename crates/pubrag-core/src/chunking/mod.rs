//! Splits annotated documents into ordered chunks.
//!
//! Every strategy works passage by passage on word pieces (a run of
//! non-whitespace or a run of whitespace), so chunk text is always an exact
//! slice of a passage and chunk offsets stay document-absolute.

mod annotation_aware;
mod grouped;
mod passage;
mod pieces;
mod sliding;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{Annotation, Chunk, Document, Infons, Passage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    Passage,
    #[default]
    SlidingWindow,
    AnnotationAware,
    GroupedAnnotationAwareSlidingWindow,
}

impl ChunkStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkStrategy::Passage => "passage",
            ChunkStrategy::SlidingWindow => "sliding_window",
            ChunkStrategy::AnnotationAware => "annotation_aware",
            ChunkStrategy::GroupedAnnotationAwareSlidingWindow => {
                "grouped_annotation_aware_sliding_window"
            }
        }
    }

    pub fn uses_window(self) -> bool {
        !matches!(self, ChunkStrategy::Passage)
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "passage" => Ok(ChunkStrategy::Passage),
            "sliding_window" => Ok(ChunkStrategy::SlidingWindow),
            "annotation_aware" => Ok(ChunkStrategy::AnnotationAware),
            "grouped_annotation_aware_sliding_window" => {
                Ok(ChunkStrategy::GroupedAnnotationAwareSlidingWindow)
            }
            other => Err(Error::Configuration(format!("unknown chunker strategy '{other}'"))),
        }
    }
}

/// A chunk before ordering and sequence assignment.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub text: String,
    pub offset: usize,
    pub annotations: Vec<Annotation>,
    pub infons: Infons,
    pub oversized: bool,
    pub annotation_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    strategy: ChunkStrategy,
    window_size: usize,
    excluded_passage_types: Vec<Regex>,
}

impl Chunker {
    pub fn new(strategy: ChunkStrategy, window_size: usize) -> Result<Self> {
        if strategy.uses_window() && window_size == 0 {
            return Err(Error::Configuration(format!(
                "{strategy} chunking needs a positive window size"
            )));
        }
        Ok(Self { strategy, window_size, excluded_passage_types: Vec::new() })
    }

    /// Skip passages whose `type` infon matches any pattern (case-insensitive).
    pub fn with_excluded_passage_types<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.excluded_passage_types = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::Configuration(format!("bad passage pattern '{}': {e}", p.as_ref())))
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Same strategy and exclusions with another window size.
    pub fn resized(&self, window_size: usize) -> Result<Self> {
        let mut next = Self::new(self.strategy, window_size)?;
        next.excluded_passage_types.clone_from(&self.excluded_passage_types);
        Ok(next)
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let mut drafts = Vec::new();
        for passage in document.passages.iter().filter(|p| self.keeps(p)) {
            let infons = inherited_infons(&document.infons, &passage.infons);
            let produced = match self.strategy {
                ChunkStrategy::Passage => passage::chunk(passage, infons),
                ChunkStrategy::SlidingWindow => sliding::chunk(passage, infons, self.window_size),
                ChunkStrategy::AnnotationAware => {
                    annotation_aware::chunk(passage, infons, self.window_size)
                }
                ChunkStrategy::GroupedAnnotationAwareSlidingWindow => {
                    grouped::chunk(passage, infons, self.window_size)
                }
            };
            drafts.extend(produced);
        }
        drafts.sort_by_key(|d| d.offset);
        tracing::debug!(
            document = %document.id,
            strategy = %self.strategy,
            chunks = drafts.len(),
            "chunked document"
        );
        drafts
            .into_iter()
            .zip(1u32..)
            .map(|(d, sequence)| Chunk {
                sequence,
                text: d.text,
                offset: d.offset,
                annotations: d.annotations,
                infons: d.infons,
                strategy: self.strategy,
                oversized: d.oversized,
                annotation_type: d.annotation_type,
            })
            .collect()
    }

    fn keeps(&self, passage: &Passage) -> bool {
        match passage.infons.get("type") {
            Some(kind) => !self.excluded_passage_types.iter().any(|re| re.is_match(kind)),
            None => true,
        }
    }
}

fn inherited_infons(document: &Infons, passage: &Infons) -> Infons {
    let mut out = document.clone();
    out.extend(passage.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}
