use std::fmt::Display;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument, Term};

use pdr_core::{Chunk, Error, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields, TOKENIZER_NAME};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// A chunk position and its BM25 score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalHit {
	/// Index into the chunk slice the index was built from.
	pub ord: usize,
	pub score: f32,
}

/// BM25 index over one chunk set, held in RAM.
///
/// The chunk set is the whole corpus: document frequencies and average
/// length come from it alone, so scores are only comparable within one index.
pub struct Bm25Index {
	index: Index,
	reader: IndexReader,
	fields: ChunkFields,
	len: usize,
}

impl Bm25Index {
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		let (schema, fields) = build_schema();
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);
		// single thread keeps doc ids in chunk order
		let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES).map_err(index_err)?;
		for (ord, chunk) in chunks.iter().enumerate() {
			writer
				.add_document(doc!(fields.ord => ord as u64, fields.text => chunk.content.clone()))
				.map_err(index_err)?;
		}
		writer.commit().map_err(index_err)?;
		let reader = index.reader().map_err(index_err)?;
		tracing::trace!(chunks = chunks.len(), "built bm25 index");
		Ok(Self { index, reader, fields, len: chunks.len() })
	}

	pub fn len(&self) -> usize { self.len }

	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Top `k` chunks for `query`, best first; equal scores keep chunk order.
	/// The query goes through the same analyzer as the chunks and becomes a
	/// disjunction of its terms, so query syntax never applies; a query
	/// without indexable terms matches nothing.
	pub fn search(&self, query: &str, k: usize) -> Result<Vec<LexicalHit>> {
		if k == 0 || self.len == 0 { return Ok(vec![]); }
		let terms = self.query_terms(query)?;
		if terms.is_empty() {
			tracing::debug!("query has no indexable terms");
			return Ok(vec![]);
		}
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.fields.text, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		let q = BooleanQuery::new(clauses);
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k)).map_err(index_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
			let ord = doc
				.get_first(self.fields.ord)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| Error::Index("stored ord missing".into()))?;
			hits.push(LexicalHit { ord: ord as usize, score });
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.ord.cmp(&b.ord)));
		Ok(hits)
	}

	/// Distinct analyzed terms of `query`, in first-seen order.
	pub fn query_terms(&self, query: &str) -> Result<Vec<String>> {
		let mut analyzer = self
			.index
			.tokenizers()
			.get(TOKENIZER_NAME)
			.ok_or_else(|| Error::Index(format!("tokenizer '{TOKENIZER_NAME}' not registered")))?;
		let mut terms: Vec<String> = Vec::new();
		let mut stream = analyzer.token_stream(query);
		stream.process(&mut |token| {
			if !terms.contains(&token.text) { terms.push(token.text.clone()); }
		});
		Ok(terms)
	}
}

fn index_err(e: impl Display) -> Error {
	Error::Index(e.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chunks(texts: &[&str]) -> Vec<Chunk> {
		texts.iter().enumerate().map(|(i, t)| Chunk::new(format!("c{i}"), "doc", *t).with_index(i)).collect()
	}

	#[test]
	fn empty_chunk_set_returns_no_hits() {
		let index = Bm25Index::build(&[]).unwrap();
		assert!(index.is_empty());
		assert!(index.search("anything", 5).unwrap().is_empty());
	}

	#[test]
	fn zero_k_returns_no_hits() {
		let index = Bm25Index::build(&chunks(&["fire safety"])).unwrap();
		assert!(index.search("fire", 0).unwrap().is_empty());
	}

	#[test]
	fn stopword_only_query_matches_nothing() {
		let index = Bm25Index::build(&chunks(&["the quarterly report", "what is the plan"])).unwrap();
		assert!(index.search("the and of", 5).unwrap().is_empty());
		assert!(index.search("what is the and", 5).unwrap().is_empty());
		assert!(index.search("OR", 5).unwrap().is_empty());
	}

	#[test]
	fn trailing_connective_does_not_match_everything() {
		let index = Bm25Index::build(&chunks(&["revenue grew", "cafeteria hours", "parking rules"])).unwrap();
		let hits = index.search("revenue and", 5).unwrap();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].ord, 0);
	}

	#[test]
	fn query_terms_use_the_chunk_analyzer() {
		let index = Bm25Index::build(&chunks(&["x"])).unwrap();
		assert_eq!(index.query_terms("Revenue: \"grew (in Q3) AND revenue").unwrap(), ["revenue", "grew", "q3"]);
		assert!(index.query_terms("  ").unwrap().is_empty());
	}

	#[test]
	fn syntax_characters_do_not_fail() {
		let index = Bm25Index::build(&chunks(&["revenue grew (in Q3)"])).unwrap();
		let hits = index.search("revenue: \"grew (", 5).unwrap();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].ord, 0);
	}
}
