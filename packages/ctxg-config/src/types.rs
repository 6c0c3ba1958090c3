use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub traces: Traces,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub mcp_bind: String,
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub backend: StorageBackend,
	pub qdrant: Qdrant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
	Qdrant,
	Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection_prefix: String,
	pub vector_dim: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub path: String,
	/// Inline credential. Blank values are normalized to `None` and the key is then read from
	/// `api_key_env` at call time.
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default = "default_api_key_env")]
	pub api_key_env: String,
	pub model: String,
	pub dimensions: u32,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Traces {
	/// Namespace used when a request carries no `project_dir`. Falls back to the process
	/// working directory when unset.
	pub default_project_dir: Option<String>,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_api_key_env() -> String {
	"VOYAGE_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
	30_000
}
