//! Lazily opened per-namespace index handles.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use tokio::sync::{OnceCell, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ctxg_storage::{IndexBackend, VectorIndex};

/// One namespace's index plus the lock that orders its writes against its reads.
///
/// Writers (store, outcome update) hold the write side for the whole check-and-insert or
/// replace, so readers never see an entry half-way through a replace.
pub struct Namespace {
	name: String,
	index: Arc<dyn VectorIndex>,
	lock: RwLock<()>,
}
impl Namespace {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn index(&self) -> &dyn VectorIndex {
		self.index.as_ref()
	}

	pub async fn read(&self) -> RwLockReadGuard<'_, ()> {
		self.lock.read().await
	}

	pub async fn write(&self) -> RwLockWriteGuard<'_, ()> {
		self.lock.write().await
	}
}

/// Owned cache of namespace handles. Each namespace is opened at most once for the lifetime of
/// the registry, even when first requested by concurrent callers.
pub struct NamespaceRegistry {
	backend: Arc<dyn IndexBackend>,
	namespaces: Mutex<HashMap<String, Arc<OnceCell<Arc<Namespace>>>>>,
}
impl NamespaceRegistry {
	pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
		Self { backend, namespaces: Mutex::new(HashMap::new()) }
	}

	pub async fn get(&self, name: &str) -> ctxg_storage::Result<Arc<Namespace>> {
		let cell = {
			let mut namespaces = self.namespaces.lock().unwrap_or_else(|err| err.into_inner());

			namespaces.entry(name.to_string()).or_default().clone()
		};
		let namespace = cell
			.get_or_try_init(|| async {
				let index = self.backend.open(name).await?;

				tracing::info!(namespace = name, "Opened trace namespace.");

				Ok::<_, ctxg_storage::Error>(Arc::new(Namespace {
					name: name.to_string(),
					index,
					lock: RwLock::new(()),
				}))
			})
			.await?;

		Ok(namespace.clone())
	}

	/// Number of namespaces opened so far.
	pub fn len(&self) -> usize {
		let namespaces = self.namespaces.lock().unwrap_or_else(|err| err.into_inner());

		namespaces.values().filter(|cell| cell.initialized()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
