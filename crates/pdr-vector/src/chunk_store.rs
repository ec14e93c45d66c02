use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;

use pdr_core::{Chunk, ChunkStore, Error, Result, SearchScope};

use crate::filter::scope_filter;
use crate::rows::batch_to_chunks;
use crate::table::{open_db, open_if_exists};

/// Chunk store backed by the LanceDB chunk table.
pub struct LanceChunkStore { db: Connection, table_name: String }

impl LanceChunkStore {
    pub async fn new(uri: &str, table_name: &str) -> Result<Self> {
        Ok(Self { db: open_db(uri).await?, table_name: table_name.to_string() })
    }

    async fn fetch(&self, scope: &SearchScope) -> Result<Vec<Chunk>> {
        let Some(filter) = scope_filter(scope) else { return Ok(vec![]) };
        let Some(table) = open_if_exists(&self.db, &self.table_name).await? else {
            tracing::debug!(table = %self.table_name, "chunk table not created yet");
            return Ok(vec![]);
        };
        let rows = table.count_rows(Some(filter.clone())).await.map_err(store_err)?;
        if rows == 0 { return Ok(vec![]); }
        let mut stream = table.query().only_if(filter).limit(rows).execute().await.map_err(store_err)?;
        let mut chunks = Vec::with_capacity(rows);
        while let Some(batch) = stream.try_next().await.map_err(store_err)? {
            chunks.extend(batch_to_chunks(&batch)?);
        }
        order_chunks(&mut chunks, scope);
        Ok(chunks)
    }
}

fn store_err(e: impl std::fmt::Display) -> Error {
    Error::Store(e.to_string())
}

/// Document order follows the scope's id list (first appearance for company
/// scope), then `chunk_index`.
fn order_chunks(chunks: &mut [Chunk], scope: &SearchScope) {
    let mut doc_order: Vec<String> = match scope {
        SearchScope::MultiDocument(ids) => ids.clone(),
        _ => Vec::new(),
    };
    for c in chunks.iter() {
        if !doc_order.contains(&c.document_id) { doc_order.push(c.document_id.clone()); }
    }
    chunks.sort_by_key(|c| (doc_order.iter().position(|d| *d == c.document_id), c.chunk_index));
}

impl ChunkStore for LanceChunkStore {
    async fn get_chunks_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.fetch(&SearchScope::Document(document_id.to_string())).await
    }

    async fn get_chunks_by_company(&self, company_id: &str) -> Result<Vec<Chunk>> {
        self.fetch(&SearchScope::Company(company_id.to_string())).await
    }

    async fn get_chunks_by_document_set(&self, document_ids: &[String]) -> Result<Vec<Chunk>> {
        self.fetch(&SearchScope::MultiDocument(document_ids.to_vec())).await
    }
}
