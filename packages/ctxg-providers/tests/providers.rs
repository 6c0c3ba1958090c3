use reqwest::header::AUTHORIZATION;
use serde_json::Map;

use ctxg_config::EmbeddingProviderConfig;
use ctxg_providers::Error;

fn embedding_config(api_key: Option<&str>, api_key_env: &str) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "voyage".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		path: "/v1/embeddings".to_string(),
		api_key: api_key.map(str::to_string),
		api_key_env: api_key_env.to_string(),
		model: "voyage-3".to_string(),
		dimensions: 4,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		ctxg_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_header() {
	let mut default_headers = Map::new();

	default_headers.insert("X-Retry".to_string(), serde_json::json!(3));

	let err = ctxg_providers::auth_headers("secret", &default_headers)
		.expect_err("Expected header validation error.");

	assert!(matches!(err, Error::InvalidConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn inline_key_wins_over_environment() {
	let cfg = embedding_config(Some(" inline-key "), "CTXG_TEST_KEY_NEVER_SET_7F3A");

	assert_eq!(ctxg_providers::resolve_api_key(&cfg).expect("key"), "inline-key");
}

#[test]
fn missing_key_names_environment_variable() {
	let cfg = embedding_config(None, "CTXG_TEST_KEY_NEVER_SET_7F3A");
	let err = ctxg_providers::resolve_api_key(&cfg).expect_err("Expected missing key.");

	assert!(
		matches!(err, Error::MissingApiKey { ref env } if env == "CTXG_TEST_KEY_NEVER_SET_7F3A")
	);
	assert!(err.to_string().contains("CTXG_TEST_KEY_NEVER_SET_7F3A"));
}

#[tokio::test]
async fn embed_without_key_fails_before_network() {
	let cfg = embedding_config(None, "CTXG_TEST_KEY_NEVER_SET_7F3A");
	let err = ctxg_providers::embedding::embed(&cfg, &["some decision text".to_string()])
		.await
		.expect_err("Expected missing key.");

	assert!(matches!(err, Error::MissingApiKey { .. }), "Unexpected error: {err}");
}
