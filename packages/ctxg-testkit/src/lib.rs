mod error;

pub use error::{Error, Result};

use std::{env, thread, time::Duration};

use qdrant_client::Qdrant;
use serde_json::Map;
use tokio::{runtime::Builder, time};
use uuid::Uuid;

use ctxg_config::{
	Config, EmbeddingProviderConfig, Providers, Service, Storage, StorageBackend, Traces,
};

pub const TEST_VECTOR_DIM: u32 = 64;

/// A Qdrant collection prefix unique to one test, with best-effort removal of every collection
/// created under it.
pub struct TestQdrant {
	url: String,
	prefix: String,
	cleaned: bool,
}
impl TestQdrant {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			prefix: format!("ctxg_test_{}", Uuid::new_v4().simple()),
			cleaned: false,
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn collection_prefix(&self) -> &str {
		&self.prefix
	}

	pub async fn cleanup(mut self) -> Result<()> {
		cleanup_qdrant_collections(&self.url, &self.prefix).await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestQdrant {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let url = self.url.clone();
		let prefix = self.prefix.clone();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test Qdrant cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(cleanup_qdrant_collections(&url, &prefix)) {
				eprintln!("Test Qdrant cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("CTXG_QDRANT_URL").ok().filter(|url| !url.trim().is_empty())
}

/// Deterministic bag-of-words embedding: each lowercase alphanumeric token is hashed into one of
/// `dim` signed buckets and the result is L2-normalized. Texts sharing words land closer together.
pub fn hash_embedding(text: &str, dim: usize) -> Vec<f32> {
	let dim = dim.max(1);
	let mut vector = vec![0.0_f32; dim];

	for token in text
		.split(|ch: char| !ch.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_lowercase)
	{
		let hash = blake3::hash(token.as_bytes());
		let bytes = hash.as_bytes();
		let mut bucket = [0_u8; 8];

		bucket.copy_from_slice(&bytes[..8]);

		let idx = (u64::from_le_bytes(bucket) % dim as u64) as usize;
		let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

		vector[idx] += sign;
	}

	let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm == 0.0 {
		vector[0] = 1.0;

		return vector;
	}

	vector.iter_mut().for_each(|value| *value /= norm);

	vector
}

pub fn embedding_config(vector_dim: u32) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		path: "/v1/embeddings".to_string(),
		api_key: Some("test-key".to_string()),
		api_key_env: "CTXG_TEST_EMBEDDING_KEY".to_string(),
		model: "test-embedding".to_string(),
		dimensions: vector_dim,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

pub fn test_config(backend: StorageBackend, qdrant_url: &str, collection_prefix: &str) -> Config {
	Config {
		service: Service {
			mcp_bind: "127.0.0.1:0".to_string(),
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			backend,
			qdrant: ctxg_config::Qdrant {
				url: qdrant_url.to_string(),
				collection_prefix: collection_prefix.to_string(),
				vector_dim: TEST_VECTOR_DIM,
			},
		},
		providers: Providers { embedding: embedding_config(TEST_VECTOR_DIM) },
		traces: Traces { default_project_dir: Some("/tmp/ctxg-test-default".to_string()) },
	}
}

pub fn memory_config() -> Config {
	test_config(StorageBackend::Memory, "http://127.0.0.1:6334", "ctxg_test")
}

async fn cleanup_qdrant_collections(url: &str, prefix: &str) -> Result<()> {
	let client = Qdrant::from_url(url)
		.build()
		.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;
	let max_attempts = 6;
	let mut backoff = Duration::from_millis(100);

	for attempt in 1..=max_attempts {
		let existing = time::timeout(Duration::from_secs(10), client.list_collections())
			.await
			.map_err(|_| Error::Message("Qdrant list_collections timed out.".to_string()))?
			.map_err(|err| Error::Message(format!("Failed to list Qdrant collections: {err}.")))?;
		let remaining = existing
			.collections
			.into_iter()
			.map(|collection| collection.name)
			.filter(|name| name.starts_with(prefix))
			.collect::<Vec<_>>();

		if remaining.is_empty() {
			return Ok(());
		}

		for collection in remaining {
			let result = time::timeout(
				Duration::from_secs(10),
				client.delete_collection(collection.clone()),
			)
			.await;

			match result {
				Ok(Ok(_)) => {},
				Ok(Err(err)) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Failed to delete Qdrant collection {collection:?} after {attempt} attempts: {err}."
						)));
					},
				Err(_) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Timed out deleting Qdrant collection {collection:?} after {attempt} attempts."
						)));
					},
			}
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn distance(a: &[f32], b: &[f32]) -> f32 {
		a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
	}

	#[test]
	fn hash_embedding_is_deterministic_and_normalized() {
		let a = hash_embedding("Chose FastAPI over Flask", 64);
		let b = hash_embedding("chose fastapi over flask", 64);
		let norm = a.iter().map(|value| value * value).sum::<f32>().sqrt();

		assert_eq!(a, b);
		assert_eq!(a.len(), 64);
		assert!((norm - 1.0).abs() < 1e-5);
	}

	#[test]
	fn shared_words_are_nearer() {
		let stored = hash_embedding("Use Redis for session caching", 64);
		let related = hash_embedding("redis caching", 64);
		let unrelated = hash_embedding("quarterly budget spreadsheet", 64);

		assert!(distance(&stored, &related) < distance(&stored, &unrelated));
	}

	#[test]
	fn empty_text_still_has_unit_norm() {
		let vector = hash_embedding("   ", 8);

		assert_eq!(vector[0], 1.0);
	}
}
