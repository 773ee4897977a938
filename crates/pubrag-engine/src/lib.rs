//! Ingestion pipeline and retrieval engine over the pubrag components.

pub mod grouping;
pub mod ingest;
pub mod postfilter;
pub mod retrieval;

pub use grouping::group_by_article;
pub use ingest::{summary_prefixed, IngestFailure, IngestReport, Ingestor};
pub use postfilter::{apply_post_filters, fuzzy_score};
pub use retrieval::{candidate_limit, RetrievalEngine};
