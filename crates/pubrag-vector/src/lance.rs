//! LanceDB-backed [`VectorIndex`].
//!
//! Filterable payload fields are promoted to scalar columns so conditions run
//! as SQL prefilters inside LanceDB; the complete payload travels as JSON.

use std::collections::HashMap;

use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};

use pubrag_core::{
    Condition, DistinctValue, EmbeddingRecord, Error, IndexField, Result, SearchResult, VectorIndex,
};

use crate::convert::{batch_to_results, column_values, records_to_batch, validate_record};
use crate::schema::{build_chunk_schema, vector_dim, CHUNK_ID};
use crate::sql::conditions_to_sql;
use crate::table::{create_table, open_db, table_exists};

pub struct LanceIndex {
    db: Connection,
    table_name: String,
}

impl LanceIndex {
    pub async fn connect(uri: &str, table_name: &str) -> Result<Self> {
        let db = open_db(uri).await?;
        Ok(Self { db, table_name: table_name.to_string() })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn table(&self) -> Result<Table> {
        if !table_exists(&self.db, &self.table_name).await? {
            return Err(Error::NotFound(format!("index '{}'", self.table_name)));
        }
        self.db
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| Error::external(&format!("opening table {}", self.table_name), e))
    }

    async fn table_dim(&self, table: &Table) -> Result<usize> {
        let schema = table.schema().await.map_err(|e| Error::external("reading schema", e))?;
        vector_dim(&schema)
            .ok_or_else(|| Error::ExternalService(format!("table '{}' has no vector column", self.table_name)))
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn exists(&self) -> Result<bool> {
        table_exists(&self.db, &self.table_name).await
    }

    async fn create(&self, dim: usize) -> Result<()> {
        if dim == 0 {
            return Err(Error::Configuration("index dimension must be positive".into()));
        }
        let dim = i32::try_from(dim).map_err(|e| Error::Configuration(format!("dimension {dim}: {e}")))?;
        create_table(&self.db, &self.table_name, build_chunk_schema(dim)).await?;
        tracing::info!(table = %self.table_name, dim, "created lancedb index");
        Ok(())
    }

    async fn dimension(&self) -> Result<usize> {
        let table = self.table().await?;
        self.table_dim(&table).await
    }

    async fn upsert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<usize> {
        let table = self.table().await?;
        if records.is_empty() {
            return Ok(0);
        }
        let dim = self.table_dim(&table).await?;
        for record in &records {
            validate_record(record, dim)?;
        }
        let batch = records_to_batch(&records, dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));

        let mut mi = table.merge_insert(&[CHUNK_ID]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(|e| Error::external("merge insert", e))?;
        tracing::debug!(table = %self.table_name, records = records.len(), "upserted records");
        Ok(records.len())
    }

    async fn search_with_filters(
        &self,
        vector: &[f32],
        conditions: &[Condition],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let table = self.table().await?;
        let dim = self.table_dim(&table).await?;
        if vector.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: vector.len() });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut query = table
            .vector_search(vector.to_vec())
            .map_err(|e| Error::external("vector search", e))?
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if let Some(sql) = conditions_to_sql(conditions)? {
            tracing::debug!(filter = %sql, "prefiltered search");
            query = query.only_if(sql);
        }
        let mut stream = query.execute().await.map_err(|e| Error::external("vector search", e))?;
        let mut results = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| Error::external("reading results", e))? {
            results.extend(batch_to_results(&batch)?);
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(results)
    }

    async fn delete_by_filter(&self, conditions: &[Condition]) -> Result<usize> {
        let table = self.table().await?;
        let Some(predicate) = conditions_to_sql(conditions)? else {
            return Err(Error::Validation("refusing to delete without conditions".into()));
        };
        let matching = table
            .count_rows(Some(predicate.clone()))
            .await
            .map_err(|e| Error::external("counting rows", e))?;
        table.delete(&predicate).await.map_err(|e| Error::external("delete", e))?;
        tracing::info!(table = %self.table_name, filter = %predicate, deleted = matching, "deleted records");
        Ok(matching)
    }

    async fn distinct_values(&self, field: IndexField, value: Option<&str>) -> Result<Vec<DistinctValue>> {
        let table = self.table().await?;
        let mut query = table.query().select(Select::columns(&[field.name()]));
        if let Some(v) = value {
            let condition = if field.is_numeric() {
                let n: i64 = v
                    .parse()
                    .map_err(|_| Error::Validation(format!("{} expects an integer, got '{v}'", field.name())))?;
                Condition::eq(field, n)
            } else {
                Condition::eq(field, v)
            };
            if let Some(sql) = conditions_to_sql(&[condition])? {
                query = query.only_if(sql);
            }
        }
        let mut stream = query.execute().await.map_err(|e| Error::external("distinct query", e))?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| Error::external("reading values", e))? {
            for v in column_values(&batch, field)? {
                *counts.entry(v).or_default() += 1;
            }
        }
        Ok(crate::sorted_distinct(counts))
    }

    async fn count(&self) -> Result<usize> {
        let table = self.table().await?;
        table.count_rows(None).await.map_err(|e| Error::external("counting rows", e))
    }
}
