pub mod index;
pub mod memory;
pub mod qdrant;

mod error;

pub use error::{Error, Result};
pub use index::{
	BoxFuture, IndexBackend, IndexEntry, IndexHit, IndexRecord, Metadata, MetadataFilter,
	VectorIndex,
};

use std::sync::Arc;

use ctxg_config::{Storage, StorageBackend};

/// Builds the backend selected by `storage.backend`.
pub fn backend(cfg: &Storage) -> Result<Arc<dyn IndexBackend>> {
	match cfg.backend {
		StorageBackend::Qdrant => Ok(Arc::new(qdrant::QdrantBackend::new(&cfg.qdrant)?)),
		StorageBackend::Memory =>
			Ok(Arc::new(memory::MemoryBackend::new(cfg.qdrant.vector_dim as usize))),
	}
}
