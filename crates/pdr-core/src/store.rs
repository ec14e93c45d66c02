//! In-process chunk store.
//!
//! Holds chunks grouped by document in insertion order. Company membership is
//! taken from `Chunk::company_id`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::traits::ChunkStore;
use crate::types::Chunk;

#[derive(Default)]
pub struct MemoryChunkStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    by_document: HashMap<String, Vec<Chunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let store = Self::new();
        store.insert_many(chunks);
        store
    }

    pub fn insert_many(&self, chunks: impl IntoIterator<Item = Chunk>) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut touched = Vec::new();
        for chunk in chunks {
            if !inner.by_document.contains_key(&chunk.document_id) {
                inner.order.push(chunk.document_id.clone());
            }
            if !touched.contains(&chunk.document_id) { touched.push(chunk.document_id.clone()); }
            inner.by_document.entry(chunk.document_id.clone()).or_default().push(chunk);
        }
        for doc in touched {
            if let Some(chunks) = inner.by_document.get_mut(&doc) { chunks.sort_by_key(|c| c.chunk_index); }
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.by_document.values().map(Vec::len).sum()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| Error::Store("chunk store lock poisoned".into()))
    }
}

impl ChunkStore for MemoryChunkStore {
    async fn get_chunks_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let inner = self.read()?;
        Ok(inner.by_document.get(document_id).cloned().unwrap_or_default())
    }

    async fn get_chunks_by_company(&self, company_id: &str) -> Result<Vec<Chunk>> {
        let inner = self.read()?;
        Ok(inner
            .order
            .iter()
            .filter_map(|doc| inner.by_document.get(doc))
            .flatten()
            .filter(|c| c.company_id.as_deref() == Some(company_id))
            .cloned()
            .collect())
    }

    async fn get_chunks_by_document_set(&self, document_ids: &[String]) -> Result<Vec<Chunk>> {
        let inner = self.read()?;
        Ok(inner
            .order
            .iter()
            .filter(|doc| document_ids.contains(doc))
            .filter_map(|doc| inner.by_document.get(doc))
            .flatten()
            .cloned()
            .collect())
    }
}
