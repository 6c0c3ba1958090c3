//! In-process index backend.
//!
//! Each namespace keeps its entries in a map behind a lock; the backend holds on to every index
//! it has opened, so reopening a namespace sees the same data for the life of the backend.

use std::{
	cmp::Ordering,
	collections::HashMap,
	sync::{Arc, Mutex, RwLock},
};

use crate::{
	BoxFuture, Error, IndexBackend, IndexEntry, IndexHit, IndexRecord, MetadataFilter, Result,
	VectorIndex,
};

pub struct MemoryBackend {
	vector_dim: usize,
	namespaces: Mutex<HashMap<String, Arc<MemoryIndex>>>,
}
impl MemoryBackend {
	pub fn new(vector_dim: usize) -> Self {
		Self { vector_dim, namespaces: Mutex::new(HashMap::new()) }
	}

	pub fn namespace_count(&self) -> usize {
		self.namespaces.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}

impl IndexBackend for MemoryBackend {
	fn open<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<Arc<dyn VectorIndex>>> {
		Box::pin(async move {
			let mut namespaces = self.namespaces.lock().unwrap_or_else(|err| err.into_inner());
			let index = namespaces
				.entry(namespace.to_string())
				.or_insert_with(|| {
					tracing::info!(namespace, "Created in-memory trace index.");

					Arc::new(MemoryIndex::new(self.vector_dim))
				})
				.clone();

			Ok(index as Arc<dyn VectorIndex>)
		})
	}
}

pub struct MemoryIndex {
	vector_dim: usize,
	entries: RwLock<HashMap<String, IndexEntry>>,
}
impl MemoryIndex {
	pub fn new(vector_dim: usize) -> Self {
		Self { vector_dim, entries: RwLock::new(HashMap::new()) }
	}

	fn check_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.vector_dim {
			return Err(Error::DimensionMismatch {
				expected: self.vector_dim,
				actual: vector.len(),
			});
		}

		Ok(())
	}

	fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, IndexEntry>> {
		self.entries.read().unwrap_or_else(|err| err.into_inner())
	}

	fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, IndexEntry>> {
		self.entries.write().unwrap_or_else(|err| err.into_inner())
	}

	fn nearest(&self, vector: &[f32], k: u64, filter: &MetadataFilter) -> Result<Vec<IndexHit>> {
		self.check_dim(vector)?;

		let entries = self.read();
		let mut scored = entries
			.values()
			.filter(|entry| filter.matches(&entry.metadata))
			.map(|entry| (euclidean(vector, &entry.vector), entry))
			.collect::<Vec<_>>();

		scored.sort_by(|(a_dist, a), (b_dist, b)| {
			a_dist.partial_cmp(b_dist).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
		});

		Ok(scored
			.into_iter()
			.take(usize::try_from(k).unwrap_or(usize::MAX))
			.map(|(distance, entry)| IndexHit {
				id: entry.id.clone(),
				text: entry.text.clone(),
				metadata: entry.metadata.clone(),
				distance: Some(distance),
			})
			.collect())
	}
}

impl VectorIndex for MemoryIndex {
	fn count(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(self.read().len() as u64) })
	}

	fn insert(&self, entry: IndexEntry) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			self.check_dim(&entry.vector)?;
			self.write().insert(entry.id.clone(), entry);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.write().remove(id);

			Ok(())
		})
	}

	fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<IndexEntry>>> {
		Box::pin(async move { Ok(self.read().get(id).cloned()) })
	}

	fn scan_all(&self) -> BoxFuture<'_, Result<Vec<IndexRecord>>> {
		Box::pin(async move {
			Ok(self
				.read()
				.values()
				.map(|entry| IndexRecord {
					id: entry.id.clone(),
					text: entry.text.clone(),
					metadata: entry.metadata.clone(),
				})
				.collect())
		})
	}

	fn knn<'a>(
		&'a self,
		vector: &'a [f32],
		k: u64,
		filter: &'a MetadataFilter,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(async move { self.nearest(vector, k, filter) })
	}
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
	use serde_json::Value;

	use super::*;
	use crate::Metadata;

	fn entry(id: &str, vector: Vec<f32>, category: &str) -> IndexEntry {
		let mut metadata = Metadata::new();

		metadata.insert("category".to_string(), Value::from(category));

		IndexEntry { id: id.to_string(), vector, text: format!("text of {id}"), metadata }
	}

	#[tokio::test]
	async fn knn_orders_nearest_first_and_respects_k() {
		let index = MemoryIndex::new(2);

		index.insert(entry("far", vec![10.0, 0.0], "a")).await.expect("insert");
		index.insert(entry("near", vec![1.0, 0.0], "a")).await.expect("insert");
		index.insert(entry("mid", vec![3.0, 0.0], "a")).await.expect("insert");

		let hits = index.knn(&[0.0, 0.0], 2, &MetadataFilter::new()).await.expect("knn");
		let ids = hits.iter().map(|hit| hit.id.as_str()).collect::<Vec<_>>();

		assert_eq!(ids, ["near", "mid"]);
		assert_eq!(hits[0].distance, Some(1.0));
		assert_eq!(hits[1].distance, Some(3.0));
	}

	#[tokio::test]
	async fn knn_applies_filter_before_limit() {
		let index = MemoryIndex::new(2);

		index.insert(entry("a1", vec![0.0, 1.0], "a")).await.expect("insert");
		index.insert(entry("b1", vec![0.0, 2.0], "b")).await.expect("insert");
		index.insert(entry("b2", vec![0.0, 3.0], "b")).await.expect("insert");

		let filter = MetadataFilter::new().eq("category", "b");
		let hits = index.knn(&[0.0, 0.0], 1, &filter).await.expect("knn");

		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "b1");
	}

	#[tokio::test]
	async fn insert_rejects_wrong_dimension() {
		let index = MemoryIndex::new(3);
		let err = index.insert(entry("x", vec![1.0], "a")).await.expect_err("dimension");

		assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 1 }));
		assert_eq!(index.count().await.expect("count"), 0);
	}

	#[tokio::test]
	async fn default_replace_keeps_vector_and_text() {
		let index = MemoryIndex::new(2);

		index.insert(entry("t", vec![0.5, 0.5], "a")).await.expect("insert");

		let mut metadata = Metadata::new();

		metadata.insert("category".to_string(), Value::from("b"));

		assert!(index.replace_metadata("t", metadata.clone()).await.expect("replace"));
		assert!(!index.replace_metadata("missing", metadata.clone()).await.expect("replace"));

		let stored = index.get("t").await.expect("get").expect("entry");

		assert_eq!(stored.vector, vec![0.5, 0.5]);
		assert_eq!(stored.text, "text of t");
		assert_eq!(stored.metadata, metadata);
		assert_eq!(index.count().await.expect("count"), 1);
	}

	#[tokio::test]
	async fn backend_reopens_the_same_namespace() {
		let backend = MemoryBackend::new(2);
		let first = backend.open("/work/a").await.expect("open");

		first.insert(entry("t", vec![0.0, 0.0], "a")).await.expect("insert");

		let again = backend.open("/work/a").await.expect("open");
		let other = backend.open("/work/b").await.expect("open");

		assert_eq!(again.count().await.expect("count"), 1);
		assert_eq!(other.count().await.expect("count"), 0);
		assert_eq!(backend.namespace_count(), 2);
	}
}
