use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// One row per chunk: the chunk columns the chunk store reads back, plus the
/// embedding the vector store searches.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("document_id", DataType::Utf8, false),
		Field::new("company_id", DataType::Utf8, true),
		Field::new("content", DataType::Utf8, false),
		Field::new("page", DataType::Int32, true),
		Field::new("chunk_index", DataType::Int32, false),
		Field::new("parent_id", DataType::Utf8, true),
		Field::new("source_method", DataType::Utf8, true),
		Field::new("meta", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
