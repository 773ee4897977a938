//! LanceDB connection and table housekeeping.
use arrow_array::RecordBatchIterator;
use arrow_schema::Schema;
use lancedb::{connect, Connection};
use std::sync::Arc;

use pubrag_core::{Error, Result};

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri)
        .execute()
        .await
        .map_err(|e| Error::external(&format!("opening lancedb at {uri}"), e))
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn
        .table_names()
        .execute()
        .await
        .map_err(|e| Error::external("listing tables", e))?;
    Ok(names.iter().any(|n| n == name))
}

/// Create an empty table; an existing table is a configuration error.
pub async fn create_table(conn: &Connection, name: &str, schema: Arc<Schema>) -> Result<()> {
    if table_exists(conn, name).await? {
        return Err(Error::Configuration(format!("table '{name}' already exists")));
    }
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter))
        .execute()
        .await
        .map_err(|e| Error::external(&format!("creating table {name}"), e))?;
    Ok(())
}
