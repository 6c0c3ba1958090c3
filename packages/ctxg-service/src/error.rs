use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Caller-facing operations, attached to provider and index failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
	StoreTrace,
	QueryTraces,
	GetTrace,
	UpdateOutcome,
	ListTraces,
	ListCategories,
}
impl Operation {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::StoreTrace => "store_trace",
			Self::QueryTraces => "query_traces",
			Self::GetTrace => "get_trace",
			Self::UpdateOutcome => "update_outcome",
			Self::ListTraces => "list_traces",
			Self::ListCategories => "list_categories",
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid {field}: {message}")]
	Validation { field: String, message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Embedding provider failed during {operation}: {message}")]
	Provider { operation: Operation, message: String },
	#[error("Trace {trace_id} not found.")]
	NotFound { trace_id: String },
	#[error("Vector index failed during {operation}: {message}")]
	Index { operation: Operation, message: String },
}
impl Error {
	/// Stable machine-readable kind.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Validation { .. } => "validation_error",
			Self::Configuration { .. } => "configuration_error",
			Self::Provider { .. } => "provider_error",
			Self::NotFound { .. } => "not_found",
			Self::Index { .. } => "index_error",
		}
	}

	pub(crate) fn index(operation: Operation, err: impl fmt::Display) -> Self {
		Self::Index { operation, message: err.to_string() }
	}

	/// Validation failures keep their field; anything else means a stored record could not be
	/// read or written.
	pub(crate) fn domain(operation: Operation, err: ctxg_domain::Error) -> Self {
		match err {
			ctxg_domain::Error::Validation { field, message } =>
				Self::Validation { field, message },
			other => Self::index(operation, other),
		}
	}

	pub(crate) fn provider(operation: Operation, err: ctxg_providers::Error) -> Self {
		match err {
			ctxg_providers::Error::MissingApiKey { env } => Self::Configuration {
				message: format!(
					"No embedding API key configured. Set {env} or providers.embedding.api_key."
				),
			},
			other => Self::Provider { operation, message: other.to_string() },
		}
	}
}
