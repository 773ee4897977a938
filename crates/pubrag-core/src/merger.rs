use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{Annotation, Chunk, MergedChunk};

/// How a chunk's annotations are folded into its indexable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    #[default]
    Append,
    Prepend,
    Inline,
    FullText,
}

impl MergeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeStrategy::Append => "append",
            MergeStrategy::Prepend => "prepend",
            MergeStrategy::Inline => "inline",
            MergeStrategy::FullText => "full_text",
        }
    }

    pub fn merge(self, text: &str, annotations: &[Annotation]) -> String {
        merge(text, annotations, self)
    }

    pub fn merge_chunk(self, chunk: Chunk) -> MergedChunk {
        let merged_text = merge(&chunk.text, &chunk.annotations, self);
        MergedChunk { chunk, merged_text, merger: self }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "append" => Ok(MergeStrategy::Append),
            "prepend" => Ok(MergeStrategy::Prepend),
            "inline" => Ok(MergeStrategy::Inline),
            "full_text" => Ok(MergeStrategy::FullText),
            other => Err(Error::Configuration(format!("unknown merger strategy '{other}'"))),
        }
    }
}

/// Combine `text` and `annotations` into one indexable string.
///
/// Annotations are deduplicated by identity key first, keeping the first
/// occurrence, so duplicated inputs merge exactly like the deduplicated list.
pub fn merge(text: &str, annotations: &[Annotation], strategy: MergeStrategy) -> String {
    let distinct = dedup_annotations(annotations);
    match strategy {
        MergeStrategy::FullText => text.to_string(),
        MergeStrategy::Append => {
            if distinct.is_empty() {
                return text.to_string();
            }
            let blocks: Vec<String> = distinct.iter().map(|a| annotation_block(a)).collect();
            format!("{text}\n\nAnnotations:\n{}", blocks.join("\n\n"))
        }
        MergeStrategy::Prepend => {
            let mut out = String::new();
            if !distinct.is_empty() {
                out.push_str("Annotations:\n");
                for ann in &distinct {
                    out.push_str(&annotation_block(ann));
                    out.push('\n');
                }
            }
            out.push_str("Chunk Text:\n");
            out.push_str(text);
            out
        }
        MergeStrategy::Inline => inline(text, &distinct),
    }
}

pub fn dedup_annotations(annotations: &[Annotation]) -> Vec<&Annotation> {
    let mut seen = HashSet::new();
    annotations.iter().filter(|a| seen.insert(a.identity_key())).collect()
}

fn annotation_block(ann: &Annotation) -> String {
    format!(
        "Text - {}\nType - {}\n{} - {}",
        ann.text, ann.entity_type, ann.ontology_label, ann.ontology_id
    )
}

fn inline_marker(ann: &Annotation) -> String {
    format!(
        "{} << Type-{}, {}-{} >>",
        ann.text, ann.entity_type, ann.ontology_label, ann.ontology_id
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Single left-to-right pass over the original text. At each position the
/// longest annotation text that matches as a whole word wins; the scan then
/// resumes after the match, so inserted markup is never rescanned.
fn inline(text: &str, distinct: &[&Annotation]) -> String {
    let mut rules: Vec<(&str, String)> = Vec::new();
    let mut seen_text = HashSet::new();
    for ann in distinct {
        if !ann.text.is_empty() && seen_text.insert(ann.text.as_str()) {
            rules.push((ann.text.as_str(), inline_marker(ann)));
        }
    }
    rules.sort_by_key(|(pattern, _)| std::cmp::Reverse(pattern.chars().count()));

    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let hit = rules.iter().find(|(pattern, _)| {
            rest.starts_with(pattern) && whole_word(prev, pattern, rest[pattern.len()..].chars().next())
        });
        if let Some((pattern, marker)) = hit {
            out.push_str(marker);
            i += pattern.len();
            prev = pattern.chars().last();
            continue;
        }
        let Some(c) = rest.chars().next() else { break };
        out.push(c);
        i += c.len_utf8();
        prev = Some(c);
    }
    out
}

/// A match must not extend into a neighbouring word on either side.
fn whole_word(before: Option<char>, pattern: &str, after: Option<char>) -> bool {
    let starts_word = pattern.chars().next().is_some_and(is_word_char);
    let ends_word = pattern.chars().last().is_some_and(is_word_char);
    let left_ok = !starts_word || !before.is_some_and(is_word_char);
    let right_ok = !ends_word || !after.is_some_and(is_word_char);
    left_ok && right_ok
}
