pub mod categories;
pub mod get;
pub mod list;
pub mod query;
pub mod registry;
pub mod store;
pub mod update;

mod error;

pub use categories::{CategorySummary, ListCategoriesRequest, ListCategoriesResponse};
pub use error::{Error, Operation, Result};
pub use get::GetTraceRequest;
pub use list::{ListTracesRequest, ListTracesResponse};
pub use query::{QueryHit, QueryTracesRequest, QueryTracesResponse};
pub use registry::{Namespace, NamespaceRegistry};
pub use store::{StoreTraceRequest, StoreTraceResponse};
pub use update::{UpdateOutcomeRequest, UpdateOutcomeResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use ctxg_config::{Config, EmbeddingProviderConfig};
use ctxg_domain::{Trace, TraceMetadata, limits};
use ctxg_providers::embedding;
use ctxg_storage::{IndexBackend, IndexRecord};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ctxg_providers::Result<Vec<Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ctxg_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

/// The decision-trace store: namespaced trace records over an embedding provider and a vector
/// index backend.
pub struct TraceStore {
	pub cfg: Config,
	pub providers: Providers,
	registry: NamespaceRegistry,
}
impl TraceStore {
	pub fn new(cfg: Config, backend: Arc<dyn IndexBackend>) -> Self {
		Self::with_providers(cfg, backend, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		backend: Arc<dyn IndexBackend>,
		providers: Providers,
	) -> Self {
		Self { cfg, providers, registry: NamespaceRegistry::new(backend) }
	}

	pub fn registry(&self) -> &NamespaceRegistry {
		&self.registry
	}

	/// Resolves the namespace for a request: the given `project_dir`, then the configured
	/// default, then the process working directory.
	pub fn resolve_namespace(&self, project_dir: Option<&str>) -> Result<String> {
		if let Some(project_dir) = limits::optional_text(project_dir) {
			return Ok(project_dir);
		}
		if let Some(default) = self.cfg.traces.default_project_dir.as_deref() {
			return Ok(default.to_string());
		}

		std::env::current_dir().map(|dir| dir.display().to_string()).map_err(|err| {
			Error::Configuration {
				message: format!("Cannot resolve the working directory as a namespace: {err}."),
			}
		})
	}

	pub(crate) async fn namespace(
		&self,
		operation: Operation,
		project_dir: Option<&str>,
	) -> Result<Arc<Namespace>> {
		let name = self.resolve_namespace(project_dir)?;

		self.registry.get(&name).await.map_err(|err| Error::index(operation, err))
	}

	pub(crate) async fn embed_one(&self, operation: Operation, text: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [text.to_string()];
		let vectors = self.providers.embedding.embed(cfg, &texts).await.map_err(|err| {
			tracing::warn!(operation = %operation, error = %err, "Embedding request failed.");

			Error::provider(operation, err)
		})?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				operation,
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected {
			return Err(Error::Provider {
				operation,
				message: format!(
					"Embedding dimension mismatch: expected {expected}, got {}.",
					vector.len()
				),
			});
		}

		Ok(vector)
	}
}

pub(crate) fn trace_from_record(operation: Operation, record: IndexRecord) -> Result<Trace> {
	let metadata = TraceMetadata::from_payload(&record.metadata).map_err(|err| Error::Index {
		operation,
		message: format!("Stored trace {} is malformed: {err}", record.id),
	})?;

	Ok(Trace { id: record.id, decision: record.text, metadata })
}
