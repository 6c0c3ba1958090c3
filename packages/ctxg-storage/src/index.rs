use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::{Map, Value};

use crate::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Free-form per-entry metadata.
pub type Metadata = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct IndexEntry {
	pub id: String,
	pub vector: Vec<f32>,
	pub text: String,
	pub metadata: Metadata,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexRecord {
	pub id: String,
	pub text: String,
	pub metadata: Metadata,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexHit {
	pub id: String,
	pub text: String,
	pub metadata: Metadata,
	/// Lower is nearer. `None` when the backend reports no distance for the hit.
	pub distance: Option<f32>,
}

/// Equality conditions on string metadata values, combined with AND.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataFilter {
	conditions: Vec<(String, String)>,
}
impl MetadataFilter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.conditions.push((key.into(), value.into()));

		self
	}

	pub fn is_empty(&self) -> bool {
		self.conditions.is_empty()
	}

	pub fn conditions(&self) -> &[(String, String)] {
		&self.conditions
	}

	pub fn matches(&self, metadata: &Metadata) -> bool {
		self.conditions.iter().all(|(key, expected)| {
			metadata.get(key).and_then(Value::as_str).is_some_and(|actual| actual == expected)
		})
	}
}

/// A persistent store of `(id, vector, text, metadata)` entries for one namespace.
///
/// `insert` replaces any entry with the same id.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn count(&self) -> BoxFuture<'_, Result<u64>>;

	fn insert(&self, entry: IndexEntry) -> BoxFuture<'_, Result<()>>;

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;

	fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<IndexEntry>>>;

	fn scan_all(&self) -> BoxFuture<'_, Result<Vec<IndexRecord>>>;

	/// Returns up to `k` entries matching `filter`, nearest first.
	fn knn<'a>(
		&'a self,
		vector: &'a [f32],
		k: u64,
		filter: &'a MetadataFilter,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>>;

	/// Replaces the metadata of an existing entry, keeping its vector and text. Returns `false`
	/// when the entry does not exist.
	///
	/// The default implementation deletes and reinserts the entry, so a reader that is not
	/// excluded by the caller can observe it as missing in between.
	fn replace_metadata<'a>(
		&'a self,
		id: &'a str,
		metadata: Metadata,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let Some(mut entry) = self.get(id).await? else { return Ok(false) };

			entry.metadata = metadata;

			self.delete(id).await?;
			self.insert(entry).await?;

			Ok(true)
		})
	}
}

/// Opens per-namespace indexes, creating backing storage on first use.
pub trait IndexBackend
where
	Self: Send + Sync,
{
	fn open<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<Arc<dyn VectorIndex>>>;
}
