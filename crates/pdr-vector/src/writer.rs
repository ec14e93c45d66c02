use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::sync::Arc;

use pdr_core::{Chunk, Error, Result};

use crate::filter::quote;
use crate::schema::build_chunk_schema;
use crate::table::{ensure_chunk_table, open_db, store_err};

const BATCH_SIZE: usize = 1000;

/// Writes chunks and their embeddings into the chunk table.
pub struct LanceChunkWriter { pub(crate) db: Connection, pub(crate) table_name: String, dim: i32 }

impl LanceChunkWriter {
	pub async fn new(uri: &str, table_name: &str, dim: usize) -> Result<Self> {
		let dim = i32::try_from(dim).map_err(|_| Error::InvalidConfig(format!("embedding dimension {dim} too large")))?;
		let db = open_db(uri).await?;
		ensure_chunk_table(&db, table_name, dim).await?;
		Ok(Self { db, table_name: table_name.to_string(), dim })
	}

	/// Replace every row of the documents present in `chunks`, then append
	/// `chunks` in batches.
	pub async fn write(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
		if chunks.is_empty() { tracing::info!("no chunks to write"); return Ok(0); }
		if chunks.len() != embeddings.len() {
			return Err(Error::InvalidInput(format!("{} chunks but {} embeddings", chunks.len(), embeddings.len())));
		}
		if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim as usize) {
			return Err(Error::InvalidInput(format!("embedding of length {} for table dimension {}", bad.len(), self.dim)));
		}
		for c in chunks {
			if let Some(p) = c.page { column_i32(&c.id, "page", u64::from(p))?; }
			column_i32(&c.id, "chunk_index", c.chunk_index as u64)?;
		}
		self.delete_documents(chunks).await?;
		tracing::info!(chunks = chunks.len(), table = %self.table_name, "writing chunks");
		let pb = ProgressBar::new(chunks.len() as u64);
		if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
			pb.set_style(style.progress_chars("#>-"));
		}
		let table = self.db.open_table(&self.table_name).execute().await.map_err(store_err)?;
		let mut written = 0usize;
		for (batch_chunks, batch_embeddings) in chunks.chunks(BATCH_SIZE).zip(embeddings.chunks(BATCH_SIZE)) {
			let record_batch = self.to_record_batch(batch_chunks, batch_embeddings)?;
			let schema = record_batch.schema();
			let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
			table.add(reader).execute().await.map_err(store_err)?;
			written += batch_chunks.len();
			pb.set_position(written as u64);
		}
		pb.finish_with_message("done");
		Ok(written)
	}

	async fn delete_documents(&self, chunks: &[Chunk]) -> Result<()> {
		let mut doc_ids: Vec<&str> = chunks.iter().map(|c| c.document_id.as_str()).collect();
		doc_ids.sort_unstable();
		doc_ids.dedup();
		let list: Vec<String> = doc_ids.iter().map(|id| quote(id)).collect();
		let table = self.db.open_table(&self.table_name).execute().await.map_err(store_err)?;
		table.delete(&format!("document_id IN ({})", list.join(", "))).await.map_err(store_err)?;
		Ok(())
	}

	fn to_record_batch(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
		let schema = build_chunk_schema(self.dim);
		let mut ids = Vec::new(); let mut doc_ids = Vec::new(); let mut company_ids = Vec::new(); let mut contents = Vec::new(); let mut pages = Vec::new(); let mut chunk_indices = Vec::new(); let mut parent_ids = Vec::new(); let mut source_methods = Vec::new(); let mut metas = Vec::new(); let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
		for (c, e) in chunks.iter().zip(embeddings) {
			ids.push(c.id.clone()); doc_ids.push(c.document_id.clone()); company_ids.push(c.company_id.clone()); contents.push(c.content.clone());
			pages.push(c.page.map(|p| column_i32(&c.id, "page", u64::from(p))).transpose()?); chunk_indices.push(column_i32(&c.id, "chunk_index", c.chunk_index as u64)?); parent_ids.push(c.parent_id.clone()); source_methods.push(c.source_method.clone());
			metas.push(serde_json::to_string(&c.meta).map_err(|e| Error::InvalidInput(e.to_string()))?);
			vectors.push(Some(e.iter().map(|&x| Some(x)).collect()));
		}
		RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(doc_ids)),
			Arc::new(StringArray::from(company_ids)),
			Arc::new(StringArray::from(contents)),
			Arc::new(Int32Array::from(pages)),
			Arc::new(Int32Array::from(chunk_indices)),
			Arc::new(StringArray::from(parent_ids)),
			Arc::new(StringArray::from(source_methods)),
			Arc::new(StringArray::from(metas)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), self.dim)),
		])
		.map_err(store_err)
	}
}

fn column_i32(chunk_id: &str, column: &str, value: u64) -> Result<i32> {
	i32::try_from(value).map_err(|_| Error::InvalidInput(format!("chunk '{chunk_id}': {column} {value} does not fit the table")))
}
