pub mod embedding;

mod error;

pub use error::{Error, Result};

use std::env;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use ctxg_config::EmbeddingProviderConfig;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Returns the inline key when configured, else the value of `api_key_env`.
pub fn resolve_api_key(cfg: &EmbeddingProviderConfig) -> Result<String> {
	if let Some(key) = cfg.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty()) {
		return Ok(key.to_string());
	}

	env::var(&cfg.api_key_env)
		.ok()
		.map(|key| key.trim().to_string())
		.filter(|key| !key.is_empty())
		.ok_or_else(|| Error::MissingApiKey { env: cfg.api_key_env.clone() })
}
