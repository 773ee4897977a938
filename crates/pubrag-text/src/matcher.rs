use std::collections::HashSet;

use tantivy::collector::DocSetCollector;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, TantivyDocument};

use pubrag_core::{Error, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, CHUNK_ID, TEXT};

const WRITER_MEMORY: usize = 15_000_000;

/// Throwaway in-RAM full-text index over a candidate list, used to apply
/// keyword filters with tantivy query syntax. Bare terms are ANDed.
pub struct KeywordMatcher {
    index: Index,
    chunk_id: Field,
    text: Field,
    len: usize,
}

impl KeywordMatcher {
    pub fn build<'a, I>(candidates: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_tokenizer(&index);
        let chunk_id = schema.get_field(CHUNK_ID).map_err(|e| Error::external("keyword schema", e))?;
        let text = schema.get_field(TEXT).map_err(|e| Error::external("keyword schema", e))?;

        let mut writer = index
            .writer_with_num_threads(1, WRITER_MEMORY)
            .map_err(|e| Error::external("keyword index writer", e))?;
        let mut len = 0;
        for (id, body) in candidates {
            writer
                .add_document(doc!(chunk_id => id.to_string(), text => body.to_string()))
                .map_err(|e| Error::external("keyword indexing", e))?;
            len += 1;
        }
        writer.commit().map_err(|e| Error::external("keyword commit", e))?;
        Ok(Self { index, chunk_id, text, len })
    }

    /// Ids of candidates matching `query`. Well-formed query syntax (`OR`,
    /// phrases) is honoured; anything else is matched as its plain words.
    pub fn matching(&self, query: &str) -> Result<HashSet<String>> {
        let mut parser = QueryParser::for_index(&self.index, vec![self.text]);
        parser.set_conjunction_by_default();
        let parsed = match parser.parse_query(query) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(query, error = %e, "keyword query is not query syntax, matching plain words");
                let (parsed, ignored) = parser.parse_query_lenient(&plain_words(query));
                if !ignored.is_empty() {
                    tracing::debug!(query, ignored = ignored.len(), "lenient keyword parse dropped clauses");
                }
                parsed
            }
        };

        let reader = self.index.reader().map_err(|e| Error::external("keyword reader", e))?;
        let searcher = reader.searcher();
        let addresses = searcher
            .search(&parsed, &DocSetCollector)
            .map_err(|e| Error::external("keyword search", e))?;

        let mut ids = HashSet::with_capacity(addresses.len());
        for addr in addresses {
            let doc: TantivyDocument = searcher.doc(addr).map_err(|e| Error::external("keyword fetch", e))?;
            if let Some(id) = doc.get_first(self.chunk_id).and_then(|v| v.as_str()) {
                ids.insert(id.to_string());
            }
        }
        tracing::debug!(query, candidates = self.len, matched = ids.len(), "keyword filter");
        Ok(ids)
    }
}

/// Query text with every character that is not a letter, digit or
/// whitespace replaced by a space.
fn plain_words(query: &str) -> String {
    query.chars().map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' }).collect()
}
