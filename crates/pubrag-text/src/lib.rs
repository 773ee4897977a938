//! pubrag-text
//!
//! Tantivy-based keyword matching over retrieval candidates.

pub mod matcher;
pub mod tantivy_utils;

pub use matcher::KeywordMatcher;
