use std::sync::Arc;

use ctxg_service::TraceStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TraceStore>,
}
impl AppState {
	pub fn new(config: ctxg_config::Config) -> color_eyre::Result<Self> {
		let backend = ctxg_storage::backend(&config.storage)?;

		tracing::info!(backend = ?config.storage.backend, "Trace store ready.");

		Ok(Self::from_store(TraceStore::new(config, backend)))
	}

	pub fn from_store(store: TraceStore) -> Self {
		Self { service: Arc::new(store) }
	}
}
