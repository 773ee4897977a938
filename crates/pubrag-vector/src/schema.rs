use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

use pubrag_core::IndexField;

pub const CHUNK_ID: &str = "chunk_id";
pub const PAYLOAD: &str = "payload";
pub const VECTOR: &str = "vector";

/// Arrow type of a promoted filter column.
pub fn field_type(field: IndexField) -> DataType {
    if field.is_numeric() {
        DataType::Int32
    } else {
        DataType::Utf8
    }
}

/// Chunk table layout: the key, one scalar column per filterable field, the
/// full payload as JSON, and the embedding.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    let mut fields = vec![Field::new(CHUNK_ID, DataType::Utf8, false)];
    fields.extend(IndexField::ALL.iter().map(|f| Field::new(f.name(), field_type(*f), true)));
    fields.push(Field::new(PAYLOAD, DataType::Utf8, false));
    fields.push(Field::new(
        VECTOR,
        DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
        true,
    ));
    Arc::new(Schema::new(fields))
}

/// Vector dimension declared by a chunk table schema.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR).ok()?.data_type() {
        DataType::FixedSizeList(_, dim) => usize::try_from(*dim).ok(),
        _ => None,
    }
}
