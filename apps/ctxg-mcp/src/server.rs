use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use color_eyre::Result;
use rmcp::{
	ErrorData, ServerHandler,
	handler::server::router::tool::ToolRouter,
	model::{CallToolResult, Content, JsonObject, ServerCapabilities, ServerInfo},
	transport::streamable_http_server::{
		StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
	},
};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::render::{self, ResponseFormat};
use ctxg_domain::limits;
use ctxg_service::{
	GetTraceRequest, ListCategoriesRequest, ListTracesRequest, QueryTracesRequest,
	StoreTraceRequest, TraceStore, UpdateOutcomeRequest,
};

#[derive(Clone)]
pub struct TraceTools {
	store: Arc<TraceStore>,
	tool_router: ToolRouter<Self>,
}
impl TraceTools {
	pub fn new(store: Arc<TraceStore>) -> Self {
		Self { store, tool_router: Self::tool_router() }
	}
}

#[rmcp::tool_router]
impl TraceTools {
	#[rmcp::tool(
		name = "context_store_trace",
		description = "Store a decision trace so later work can find it by meaning. Returns the new trace_id.",
		input_schema = store_trace_schema()
	)]
	pub async fn context_store_trace(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let format = take_format(&mut params, ResponseFormat::Json)?;
		let req = StoreTraceRequest {
			decision: take_required_string(&mut params, "decision")?,
			category: take_optional_string(&mut params, "category")?,
			outcome: take_optional_string(&mut params, "outcome")?,
			feature_id: take_optional_string(&mut params, "feature_id")?,
			project_dir: take_optional_string(&mut params, "project_dir")?,
		};

		match self.store.store_trace(req).await {
			Ok(resp) => Ok(render_result(
				format,
				|| render::store_json(&resp),
				|| render::store_markdown(&resp),
			)),
			Err(err) => Ok(error_result("context_store_trace", err)),
		}
	}

	#[rmcp::tool(
		name = "context_query_traces",
		description = "Find stored decision traces semantically similar to a query, nearest first.",
		input_schema = query_traces_schema()
	)]
	pub async fn context_query_traces(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let format = take_format(&mut params, ResponseFormat::Markdown)?;
		let req = QueryTracesRequest {
			query: take_required_string(&mut params, "query")?,
			limit: take_optional_i64(&mut params, "limit")?,
			category: take_optional_string(&mut params, "category")?,
			outcome: take_optional_string(&mut params, "outcome")?,
			project_dir: take_optional_string(&mut params, "project_dir")?,
		};

		match self.store.query_traces(req).await {
			Ok(resp) => Ok(render_result(
				format,
				|| render::query_json(&resp),
				|| render::query_markdown(&resp),
			)),
			Err(err) => Ok(error_result("context_query_traces", err)),
		}
	}

	#[rmcp::tool(
		name = "context_get_trace",
		description = "Fetch a single decision trace by trace_id.",
		input_schema = get_trace_schema()
	)]
	pub async fn context_get_trace(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let format = take_format(&mut params, ResponseFormat::Markdown)?;
		let req = GetTraceRequest {
			trace_id: take_required_string(&mut params, "trace_id")?,
			project_dir: take_optional_string(&mut params, "project_dir")?,
		};

		match self.store.get_trace(req).await {
			Ok(trace) => Ok(render_result(
				format,
				|| render::trace_json(&trace),
				|| render::trace_markdown(&trace),
			)),
			Err(err) => Ok(error_result("context_get_trace", err)),
		}
	}

	#[rmcp::tool(
		name = "context_update_outcome",
		description = "Record whether a stored decision worked out: pending, success or failure.",
		input_schema = update_outcome_schema()
	)]
	pub async fn context_update_outcome(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let format = take_format(&mut params, ResponseFormat::Json)?;
		let req = UpdateOutcomeRequest {
			trace_id: take_required_string(&mut params, "trace_id")?,
			outcome: take_required_string(&mut params, "outcome")?,
			project_dir: take_optional_string(&mut params, "project_dir")?,
		};

		match self.store.update_outcome(req).await {
			Ok(resp) => Ok(render_result(
				format,
				|| render::update_json(&resp),
				|| render::update_markdown(&resp),
			)),
			Err(err) => Ok(error_result("context_update_outcome", err)),
		}
	}

	#[rmcp::tool(
		name = "context_list_traces",
		description = "List stored decision traces, newest first, with optional filters and pagination.",
		input_schema = list_traces_schema()
	)]
	pub async fn context_list_traces(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let format = take_format(&mut params, ResponseFormat::Markdown)?;
		let req = ListTracesRequest {
			category: take_optional_string(&mut params, "category")?,
			outcome: take_optional_string(&mut params, "outcome")?,
			limit: take_optional_i64(&mut params, "limit")?,
			offset: take_optional_i64(&mut params, "offset")?,
			project_dir: take_optional_string(&mut params, "project_dir")?,
		};

		match self.store.list_traces(req).await {
			Ok(resp) => Ok(render_result(
				format,
				|| render::list_json(&resp),
				|| render::list_markdown(&resp),
			)),
			Err(err) => Ok(error_result("context_list_traces", err)),
		}
	}

	#[rmcp::tool(
		name = "context_list_categories",
		description = "Summarize stored traces per category with outcome counts.",
		input_schema = list_categories_schema()
	)]
	pub async fn context_list_categories(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let format = take_format(&mut params, ResponseFormat::Markdown)?;
		let req = ListCategoriesRequest {
			project_dir: take_optional_string(&mut params, "project_dir")?,
		};

		match self.store.list_categories(req).await {
			Ok(resp) => Ok(render_result(
				format,
				|| render::categories_json(&resp),
				|| render::categories_markdown(&resp),
			)),
			Err(err) => Ok(error_result("context_list_categories", err)),
		}
	}
}

#[rmcp::tool_handler]
impl ServerHandler for TraceTools {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			instructions: Some(
				"Decision traces with semantic retrieval. Store decisions as they are made, query \
				 them by meaning later, and record how they turned out."
					.to_string(),
			),
			capabilities: ServerCapabilities::builder().enable_tools().build(),
			..Default::default()
		}
	}
}

pub async fn serve_mcp(bind_addr: &str, store: Arc<TraceStore>) -> Result<()> {
	let bind_addr: SocketAddr = bind_addr.parse()?;
	let session_manager: Arc<LocalSessionManager> = Default::default();
	let service = StreamableHttpService::new(
		move || Ok(TraceTools::new(store.clone())),
		session_manager,
		StreamableHttpServerConfig::default(),
	);
	let router = Router::new().fallback_service(service);
	let listener = TcpListener::bind(bind_addr).await?;

	tracing::info!(%bind_addr, "MCP server listening.");

	axum::serve(listener, router).await?;

	Ok(())
}

fn render_result(
	format: ResponseFormat,
	json: impl FnOnce() -> Value,
	markdown: impl FnOnce() -> String,
) -> CallToolResult {
	match format {
		ResponseFormat::Json => CallToolResult::structured(json()),
		ResponseFormat::Markdown => CallToolResult::success(vec![Content::text(markdown())]),
	}
}

fn error_result(tool: &str, err: ctxg_service::Error) -> CallToolResult {
	tracing::warn!(tool, error_code = err.code(), error = %err, "Tool call failed.");

	CallToolResult::error(vec![Content::text(format!("Error: {err}"))])
}

fn take_required_string(params: &mut JsonObject, key: &str) -> Result<String, ErrorData> {
	let value = params
		.remove(key)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} is required."), None))?;
	let text = value
		.as_str()
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be a string."), None))?;

	Ok(text.to_string())
}

// Blank and null values pass through as absent after trimming in the store.
fn take_optional_string(params: &mut JsonObject, key: &str) -> Result<Option<String>, ErrorData> {
	match params.remove(key) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(text)) => Ok(Some(text)),
		Some(_) => Err(ErrorData::invalid_params(format!("{key} must be a string."), None)),
	}
}

// Range checks belong to the store so they surface as validation errors.
fn take_optional_i64(params: &mut JsonObject, key: &str) -> Result<Option<i64>, ErrorData> {
	match params.remove(key) {
		None | Some(Value::Null) => Ok(None),
		Some(value) => value
			.as_i64()
			.map(Some)
			.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be an integer."), None)),
	}
}

fn take_format(
	params: &mut JsonObject,
	default: ResponseFormat,
) -> Result<ResponseFormat, ErrorData> {
	match take_optional_string(params, "response_format")? {
		None => Ok(default),
		Some(raw) =>
			raw.parse().map_err(|message: String| ErrorData::invalid_params(message, None)),
	}
}

fn store_trace_schema() -> Arc<JsonObject> {
	let decision_min = *limits::DECISION_CHARS.start();
	let decision_max = *limits::DECISION_CHARS.end();
	let category_max = *limits::CATEGORY_CHARS.end();

	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["decision"],
		"properties": {
			"decision": {
				"type": "string",
				"minLength": decision_min,
				"maxLength": decision_max
			},
			"category": { "type": ["string", "null"], "maxLength": category_max },
			"outcome": { "type": ["string", "null"], "enum": ["pending", "success", "failure", null] },
			"feature_id": { "type": ["string", "null"] },
			"project_dir": { "type": ["string", "null"] },
			"response_format": { "type": ["string", "null"], "enum": ["markdown", "json", null] }
		}
	}))
}

fn query_traces_schema() -> Arc<JsonObject> {
	let query_min = *limits::QUERY_CHARS.start();
	let query_max = *limits::QUERY_CHARS.end();
	let limit_min = *limits::QUERY_LIMIT.start();
	let limit_max = *limits::QUERY_LIMIT.end();

	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["query"],
		"properties": {
			"query": {
				"type": "string",
				"minLength": query_min,
				"maxLength": query_max
			},
			"limit": {
				"type": ["integer", "null"],
				"minimum": limit_min,
				"maximum": limit_max
			},
			"category": { "type": ["string", "null"] },
			"outcome": { "type": ["string", "null"], "enum": ["pending", "success", "failure", null] },
			"project_dir": { "type": ["string", "null"] },
			"response_format": { "type": ["string", "null"], "enum": ["markdown", "json", null] }
		}
	}))
}

fn get_trace_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["trace_id"],
		"properties": {
			"trace_id": { "type": "string" },
			"project_dir": { "type": ["string", "null"] },
			"response_format": { "type": ["string", "null"], "enum": ["markdown", "json", null] }
		}
	}))
}

fn update_outcome_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["trace_id", "outcome"],
		"properties": {
			"trace_id": { "type": "string" },
			"outcome": { "type": "string", "enum": ["pending", "success", "failure"] },
			"project_dir": { "type": ["string", "null"] },
			"response_format": { "type": ["string", "null"], "enum": ["markdown", "json", null] }
		}
	}))
}

fn list_traces_schema() -> Arc<JsonObject> {
	let limit_min = *limits::LIST_LIMIT.start();
	let limit_max = *limits::LIST_LIMIT.end();
	let offset_min = *limits::LIST_OFFSET.start();

	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"properties": {
			"category": { "type": ["string", "null"] },
			"outcome": { "type": ["string", "null"], "enum": ["pending", "success", "failure", null] },
			"limit": {
				"type": ["integer", "null"],
				"minimum": limit_min,
				"maximum": limit_max
			},
			"offset": { "type": ["integer", "null"], "minimum": offset_min },
			"project_dir": { "type": ["string", "null"] },
			"response_format": { "type": ["string", "null"], "enum": ["markdown", "json", null] }
		}
	}))
}

fn list_categories_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"properties": {
			"project_dir": { "type": ["string", "null"] },
			"response_format": { "type": ["string", "null"], "enum": ["markdown", "json", null] }
		}
	}))
}
