//! Native (pre-)filter conditions understood by every vector index backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{ChunkPayload, MetadataFilters};

/// Payload fields an index can filter and aggregate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexField {
    ArticleId,
    ChunkName,
    Journal,
    ArticleType,
    Year,
    Month,
    PublicationDate,
    ChunkerType,
    MergerType,
    EmbeddingsModel,
}

impl IndexField {
    pub const ALL: [IndexField; 10] = [
        IndexField::ArticleId,
        IndexField::ChunkName,
        IndexField::Journal,
        IndexField::ArticleType,
        IndexField::Year,
        IndexField::Month,
        IndexField::PublicationDate,
        IndexField::ChunkerType,
        IndexField::MergerType,
        IndexField::EmbeddingsModel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IndexField::ArticleId => "article_id",
            IndexField::ChunkName => "chunk_name",
            IndexField::Journal => "journal",
            IndexField::ArticleType => "article_type",
            IndexField::Year => "year",
            IndexField::Month => "month",
            IndexField::PublicationDate => "publication_date",
            IndexField::ChunkerType => "chunker_type",
            IndexField::MergerType => "merger_type",
            IndexField::EmbeddingsModel => "embeddings_model",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::Validation(format!("field '{name}' is not filterable")))
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, IndexField::Year | IndexField::Month)
    }

    /// Value of this field in a payload; `None` when the payload leaves it unset.
    pub fn value_of(self, payload: &ChunkPayload) -> Option<FilterValue> {
        let text = |s: &str| (!s.is_empty()).then(|| FilterValue::Text(s.to_string()));
        match self {
            IndexField::ArticleId => text(&payload.article_id),
            IndexField::ChunkName => text(&payload.chunk_name),
            IndexField::Journal => text(&payload.journal),
            IndexField::ArticleType => text(&payload.article_type),
            IndexField::Year => payload.year.map(|y| FilterValue::Int(i64::from(y))),
            IndexField::Month => payload.month.map(|m| FilterValue::Int(i64::from(m))),
            IndexField::PublicationDate => payload.publication_date.as_deref().and_then(text),
            IndexField::ChunkerType => text(&payload.chunker_type),
            IndexField::MergerType => text(&payload.merger_type),
            IndexField::EmbeddingsModel => text(&payload.embeddings_model),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Int(v) => write!(f, "{v}"),
            FilterValue::Text(v) => f.write_str(v),
        }
    }
}

/// One `field op value` term. A filter is a conjunction of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: IndexField,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Condition {
    pub fn eq(field: IndexField, value: impl Into<FilterValue>) -> Self {
        Self { field, op: FilterOp::Eq, value: value.into() }
    }

    pub fn gt(field: IndexField, value: impl Into<FilterValue>) -> Self {
        Self { field, op: FilterOp::Gt, value: value.into() }
    }

    pub fn lt(field: IndexField, value: impl Into<FilterValue>) -> Self {
        Self { field, op: FilterOp::Lt, value: value.into() }
    }

    /// Reject conditions whose value type does not fit the field.
    pub fn validate(&self) -> Result<()> {
        match (&self.value, self.field.is_numeric()) {
            (FilterValue::Int(_), true) => Ok(()),
            (FilterValue::Text(_), false) if self.op == FilterOp::Eq => Ok(()),
            _ => Err(Error::Validation(format!(
                "condition {:?} {:?} {} is not valid for this field",
                self.field, self.op, self.value
            ))),
        }
    }

    pub fn matches(&self, payload: &ChunkPayload) -> bool {
        let Some(actual) = self.field.value_of(payload) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == self.value,
            FilterOp::Gt => actual > self.value,
            FilterOp::Lt => actual < self.value,
        }
    }
}

pub fn matches_all(conditions: &[Condition], payload: &ChunkPayload) -> bool {
    conditions.iter().all(|c| c.matches(payload))
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(i64::from(v))
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl MetadataFilters {
    /// Translate the low-cardinality filters into index-native conditions.
    pub fn native_conditions(&self) -> Result<Vec<Condition>> {
        let mut out = Vec::new();
        if let Some(journal) = non_empty(self.journal.as_deref()) {
            out.push(Condition::eq(IndexField::Journal, journal));
        }
        if let Some(kind) = non_empty(self.article_type.as_deref()) {
            out.push(Condition::eq(IndexField::ArticleType, kind));
        }
        if let Some(year) = self.year {
            out.push(Condition::eq(IndexField::Year, year));
        }
        if let Some(after) = self.years_after {
            out.push(Condition::gt(IndexField::Year, after));
        }
        if let Some(before) = self.years_before {
            out.push(Condition::lt(IndexField::Year, before));
        }
        if let Some(date) = non_empty(self.date.as_deref()) {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| Error::Validation(format!("date '{date}' is not YYYY-MM-DD: {e}")))?;
            out.push(Condition::eq(IndexField::PublicationDate, date));
        }
        if let Some(ym) = non_empty(self.year_month.as_deref()) {
            let (year, month) = parse_year_month(ym)?;
            out.push(Condition::eq(IndexField::Year, year));
            out.push(Condition::eq(IndexField::Month, i64::from(month)));
        }
        Ok(out)
    }

    pub fn has_post_filters(&self) -> bool {
        [&self.title, &self.authors, &self.keyword]
            .into_iter()
            .any(|f| non_empty(f.as_deref()).is_some())
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_year_month(raw: &str) -> Result<(i32, u32)> {
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map(|d| {
            use chrono::Datelike;
            (d.year(), d.month())
        })
        .map_err(|e| Error::Validation(format!("year_month '{raw}' is not YYYY-MM: {e}")))
}
