use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use ctxg_config::{Config, Error, StorageBackend};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(edit: impl FnOnce(&mut toml::Table)) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn embedding_table(root: &mut toml::Table) -> &mut toml::Table {
	root.get_mut("providers")
		.and_then(Value::as_table_mut)
		.and_then(|providers| providers.get_mut("embedding"))
		.and_then(Value::as_table_mut)
		.expect("Template config must include [providers.embedding].")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("ctxg_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> ctxg_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = ctxg_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string()).expect("Config should load.");

	assert_eq!(cfg.storage.backend, StorageBackend::Qdrant);
	assert_eq!(cfg.providers.embedding.dimensions, 1_024);
	assert_eq!(cfg.providers.embedding.timeout_ms, 30_000);
	assert_eq!(cfg.providers.embedding.api_key.as_deref(), Some("test-key"));
	assert_eq!(cfg.traces.default_project_dir.as_deref(), Some("/tmp/ctxg-project"));
}

#[test]
fn blank_api_key_is_normalized_to_none() {
	let payload = sample_toml_with(|root| {
		embedding_table(root).insert("api_key".to_string(), Value::String("   ".to_string()));
	});
	let cfg = load_payload(payload).expect("Blank api_key must not fail loading.");

	assert!(cfg.providers.embedding.api_key.is_none());
}

#[test]
fn omitted_optional_sections_use_defaults() {
	let payload = sample_toml_with(|root| {
		root.remove("traces");

		let embedding = embedding_table(root);

		embedding.remove("api_key");
		embedding.remove("api_key_env");
		embedding.remove("timeout_ms");
	});
	let cfg = load_payload(payload).expect("Config should load with defaults.");

	assert!(cfg.traces.default_project_dir.is_none());
	assert!(cfg.providers.embedding.api_key.is_none());
	assert_eq!(cfg.providers.embedding.api_key_env, "VOYAGE_API_KEY");
	assert_eq!(cfg.providers.embedding.timeout_ms, 30_000);
}

#[test]
fn unknown_backend_fails_to_parse() {
	let payload = sample_toml_with(|root| {
		root.get_mut("storage")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [storage].")
			.insert("backend".to_string(), Value::String("chroma".to_string()));
	});
	let err = load_payload(payload).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn dimensions_must_match_vector_dim() {
	let mut cfg = base_config();

	cfg.providers.embedding.dimensions = 512;

	let err = ctxg_config::validate(&cfg).expect_err("Expected dimension mismatch error.");

	assert!(
		err.to_string()
			.contains("providers.embedding.dimensions must match storage.qdrant.vector_dim."),
		"Unexpected error: {err}"
	);
}

#[test]
fn dimensions_must_be_positive() {
	let mut cfg = base_config();

	cfg.providers.embedding.dimensions = 0;
	cfg.storage.qdrant.vector_dim = 0;

	let err = ctxg_config::validate(&cfg).expect_err("Expected dimension error.");

	assert!(
		err.to_string().contains("providers.embedding.dimensions must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn timeout_must_be_positive() {
	let mut cfg = base_config();

	cfg.providers.embedding.timeout_ms = 0;

	let err = ctxg_config::validate(&cfg).expect_err("Expected timeout error.");

	assert!(
		err.to_string().contains("providers.embedding.timeout_ms must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn collection_prefix_rejects_path_characters() {
	let mut cfg = base_config();

	cfg.storage.qdrant.collection_prefix = "traces/../x".to_string();

	let err = ctxg_config::validate(&cfg).expect_err("Expected collection prefix error.");

	assert!(
		err.to_string().contains("storage.qdrant.collection_prefix may only contain"),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_headers_must_be_strings() {
	let mut cfg = base_config();

	cfg.providers.embedding.default_headers.insert("X-Trace".to_string(), serde_json::json!(1));

	let err = ctxg_config::validate(&cfg).expect_err("Expected header error.");

	assert!(
		err.to_string().contains("providers.embedding.default_headers.X-Trace must be a string."),
		"Unexpected error: {err}"
	);
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("ctxg_config_test_missing_file.toml");
	let err = ctxg_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}
