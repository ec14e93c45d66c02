//! LanceDB connection and housekeeping helpers.

use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};
use std::fmt::Display;
use std::sync::Arc;

use pdr_core::{Error, Result};

use crate::schema::build_chunk_schema;

pub(crate) fn store_err(e: impl Display) -> Error {
    Error::VectorStore(e.to_string())
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(store_err)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(store_err)?;
    Ok(names.iter().any(|n| n == name))
}

/// Open `name`, or `None` if it has not been created yet.
pub async fn open_if_exists(conn: &Connection, name: &str) -> Result<Option<Table>> {
    if !table_exists(conn, name).await? { return Ok(None); }
    conn.open_table(name).execute().await.map(Some).map_err(store_err)
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await.map_err(store_err)?;
    Ok(())
}

pub async fn ensure_chunk_table(conn: &Connection, name: &str, dim: i32) -> Result<()> {
    ensure_table(conn, name, build_chunk_schema(dim)).await
}
