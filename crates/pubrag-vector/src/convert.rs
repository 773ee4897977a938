use arrow_array::types::Float32Type;
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, StringArray,
};
use arrow_schema::DataType;
use std::sync::Arc;

use pubrag_core::{ChunkPayload, EmbeddingRecord, Error, FilterValue, IndexField, Result, SearchResult};

use crate::schema::{build_chunk_schema, field_type, CHUNK_ID, PAYLOAD};

/// Check a record before it reaches any backend.
pub fn validate_record(record: &EmbeddingRecord, dim: usize) -> Result<()> {
    if record.payload.chunk_id.trim().is_empty() {
        return Err(Error::Validation("record has an empty chunk_id".into()));
    }
    if record.payload.article_id.trim().is_empty() {
        return Err(Error::Validation(format!("record {} has an empty article_id", record.payload.chunk_id)));
    }
    if record.vector.len() != dim {
        return Err(Error::DimensionMismatch { expected: dim, actual: record.vector.len() });
    }
    Ok(())
}

fn scalar_column(field: IndexField, records: &[EmbeddingRecord]) -> ArrayRef {
    match field_type(field) {
        DataType::Int32 => Arc::new(Int32Array::from(
            records
                .iter()
                .map(|r| match field.value_of(&r.payload) {
                    Some(FilterValue::Int(v)) => i32::try_from(v).ok(),
                    _ => None,
                })
                .collect::<Vec<Option<i32>>>(),
        )),
        _ => Arc::new(StringArray::from(
            records
                .iter()
                .map(|r| field.value_of(&r.payload).map(|v| v.to_string()))
                .collect::<Vec<Option<String>>>(),
        )),
    }
}

pub fn records_to_batch(records: &[EmbeddingRecord], dim: usize) -> Result<RecordBatch> {
    let dim_i32 = i32::try_from(dim).map_err(|e| Error::Validation(format!("dimension {dim}: {e}")))?;
    let schema = build_chunk_schema(dim_i32);

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    columns.push(Arc::new(StringArray::from(
        records.iter().map(|r| r.payload.chunk_id.clone()).collect::<Vec<_>>(),
    )));
    columns.extend(IndexField::ALL.iter().map(|f| scalar_column(*f, records)));
    let payloads = records
        .iter()
        .map(|r| serde_json::to_string(&r.payload))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    columns.push(Arc::new(StringArray::from(payloads)));
    let vectors = records.iter().map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
    columns.push(Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim_i32)));

    RecordBatch::try_new(schema, columns).map_err(|e| Error::external("building record batch", e))
}

pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::ExternalService(format!("{name} column missing")))
}

/// Decode search or query output into results. Rows without `_distance`
/// (plain scans) score 0.
pub fn batch_to_results(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let ids = string_column(batch, CHUNK_ID)?;
    let payloads = string_column(batch, PAYLOAD)?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    (0..batch.num_rows())
        .map(|i| {
            let payload: ChunkPayload = serde_json::from_str(payloads.value(i))?;
            let score = distances.map_or(0.0, |d| 1.0 - d.value(i));
            Ok(SearchResult { chunk_id: ids.value(i).to_string(), score, payload })
        })
        .collect()
}

/// Values of one promoted column as strings; nulls are skipped.
pub fn column_values(batch: &RecordBatch, field: IndexField) -> Result<Vec<String>> {
    let column = batch
        .column_by_name(field.name())
        .ok_or_else(|| Error::ExternalService(format!("{} column missing", field.name())))?;
    if let Some(ints) = column.as_any().downcast_ref::<Int32Array>() {
        return Ok((0..ints.len()).filter(|&i| ints.is_valid(i)).map(|i| ints.value(i).to_string()).collect());
    }
    if let Some(strings) = column.as_any().downcast_ref::<StringArray>() {
        return Ok((0..strings.len())
            .filter(|&i| strings.is_valid(i))
            .map(|i| strings.value(i).to_string())
            .collect());
    }
    Err(Error::ExternalService(format!("{} column has an unexpected type", field.name())))
}
