use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const CHUNK_ID: &str = "chunk_id";
pub const TEXT: &str = "text";
pub const TOKENIZER: &str = "text_with_stopwords";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field(CHUNK_ID, STRING | STORED);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    schema_builder.add_text_field(TEXT, TextOptions::default().set_indexing_options(text_field_indexing));
    schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
    let stop_words = [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it", "its", "of", "on",
        "that", "the", "to", "was", "were", "will", "with", "or", "but", "this", "these", "those", "their", "there",
        "then", "than", "so", "if", "which", "who", "can", "could", "should", "would", "may", "might", "do", "does",
        "did", "have", "had", "been",
    ];
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(stop_words.into_iter().map(str::to_string)))
        .build();
    index.tokenizers().register(TOKENIZER, tokenizer);
}
