use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};

use pdr_core::{Error, Result, SearchScope, VectorHit, VectorStore};

use crate::filter::scope_filter;
use crate::rows::batch_to_hits;
use crate::table::{open_db, open_if_exists, store_err};

/// Cosine nearest-neighbour search over the chunk table, prefiltered to the
/// scope so hits never leave the chunk universe.
pub struct LanceVectorStore { pub(crate) db: Connection, pub(crate) table_name: String }

impl LanceVectorStore {
	pub async fn new(uri: &str, table_name: &str) -> Result<Self> {
		Ok(Self { db: open_db(uri).await?, table_name: table_name.to_string() })
	}
}

impl VectorStore for LanceVectorStore {
	async fn nearest(&self, scope: &SearchScope, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
		let Some(filter) = scope_filter(scope) else { return Ok(vec![]) };
		if k == 0 { return Ok(vec![]); }
		let table = open_if_exists(&self.db, &self.table_name)
			.await?
			.ok_or_else(|| Error::NotFound(format!("vector table '{}'", self.table_name)))?;
		let mut stream = table
			.vector_search(query.to_vec())
			.map_err(store_err)?
			.distance_type(DistanceType::Cosine)
			.only_if(filter)
			.limit(k)
			.execute()
			.await
			.map_err(store_err)?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(store_err)? {
			hits.extend(batch_to_hits(&batch)?);
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(k);
		Ok(hits)
	}
}
