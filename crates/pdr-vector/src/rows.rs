//! Arrow batch → domain value conversion.

use arrow_array::{Array, Float32Array, Int32Array, RecordBatch, StringArray};

use pdr_core::types::{sanitize_score, Meta};
use pdr_core::{Chunk, Error, Result, VectorHit};

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::VectorStore(format!("column '{name}' missing or mistyped")))
}

fn opt_str(col: &StringArray, i: usize) -> Option<String> {
	if col.is_null(i) { None } else { Some(col.value(i).to_string()) }
}

pub fn batch_to_chunks(batch: &RecordBatch) -> Result<Vec<Chunk>> {
	let ids = column::<StringArray>(batch, "id")?;
	let doc_ids = column::<StringArray>(batch, "document_id")?;
	let company_ids = column::<StringArray>(batch, "company_id")?;
	let contents = column::<StringArray>(batch, "content")?;
	let pages = column::<Int32Array>(batch, "page")?;
	let chunk_indices = column::<Int32Array>(batch, "chunk_index")?;
	let parent_ids = column::<StringArray>(batch, "parent_id")?;
	let source_methods = column::<StringArray>(batch, "source_method")?;
	let metas = column::<StringArray>(batch, "meta")?;
	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let id = ids.value(i);
		let meta: Meta = serde_json::from_str(metas.value(i))
			.map_err(|e| Error::VectorStore(format!("chunk '{id}': malformed meta: {e}")))?;
		let page = if pages.is_null(i) {
			None
		} else {
			Some(u32::try_from(pages.value(i)).map_err(|_| Error::VectorStore(format!("chunk '{id}': negative page {}", pages.value(i))))?)
		};
		let chunk_index = usize::try_from(chunk_indices.value(i))
			.map_err(|_| Error::VectorStore(format!("chunk '{id}': negative chunk_index {}", chunk_indices.value(i))))?;
		out.push(Chunk {
			id: id.to_string(),
			document_id: doc_ids.value(i).to_string(),
			company_id: opt_str(company_ids, i),
			content: contents.value(i).to_string(),
			page,
			chunk_index,
			parent_id: opt_str(parent_ids, i),
			source_method: opt_str(source_methods, i),
			meta,
		});
	}
	Ok(out)
}

/// Reads `id` and `_distance` (cosine) into similarity hits.
pub fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
	let ids = column::<StringArray>(batch, "id")?;
	let distances = column::<Float32Array>(batch, "_distance")?;
	Ok((0..batch.num_rows())
		.map(|i| VectorHit { chunk_id: ids.value(i).to_string(), score: sanitize_score(1.0 - distances.value(i)) })
		.collect())
}
