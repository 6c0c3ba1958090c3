use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use ctxg_domain::Trace;
use ctxg_service::{
	Error as ServiceError, GetTraceRequest, ListCategoriesRequest, ListCategoriesResponse,
	ListTracesRequest, ListTracesResponse, QueryTracesRequest, QueryTracesResponse,
	StoreTraceRequest, StoreTraceResponse, UpdateOutcomeRequest, UpdateOutcomeResponse,
};

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
	#[serde(default)]
	pub project_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutcomeBody {
	pub outcome: String,
	#[serde(default)]
	pub project_dir: Option<String>,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/traces", post(store_trace).get(list_traces))
		.route("/v1/traces/query", post(query_traces))
		.route("/v1/traces/{trace_id}", get(get_trace))
		.route("/v1/traces/{trace_id}/outcome", post(update_outcome))
		.route("/v1/categories", get(list_categories))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn store_trace(
	State(state): State<AppState>,
	Json(payload): Json<StoreTraceRequest>,
) -> Result<Json<StoreTraceResponse>, ApiError> {
	let response = state.service.store_trace(payload).await?;

	Ok(Json(response))
}

async fn query_traces(
	State(state): State<AppState>,
	Json(payload): Json<QueryTracesRequest>,
) -> Result<Json<QueryTracesResponse>, ApiError> {
	let response = state.service.query_traces(payload).await?;

	Ok(Json(response))
}

async fn get_trace(
	State(state): State<AppState>,
	Path(trace_id): Path<String>,
	Query(query): Query<ProjectQuery>,
) -> Result<Json<Trace>, ApiError> {
	let trace = state
		.service
		.get_trace(GetTraceRequest { trace_id, project_dir: query.project_dir })
		.await?;

	Ok(Json(trace))
}

async fn update_outcome(
	State(state): State<AppState>,
	Path(trace_id): Path<String>,
	Json(payload): Json<OutcomeBody>,
) -> Result<Json<UpdateOutcomeResponse>, ApiError> {
	let response = state
		.service
		.update_outcome(UpdateOutcomeRequest {
			trace_id,
			outcome: payload.outcome,
			project_dir: payload.project_dir,
		})
		.await?;

	Ok(Json(response))
}

async fn list_traces(
	State(state): State<AppState>,
	Query(query): Query<ListTracesRequest>,
) -> Result<Json<ListTracesResponse>, ApiError> {
	let response = state.service.list_traces(query).await?;

	Ok(Json(response))
}

async fn list_categories(
	State(state): State<AppState>,
	Query(query): Query<ProjectQuery>,
) -> Result<Json<ListCategoriesResponse>, ApiError> {
	let response = state
		.service
		.list_categories(ListCategoriesRequest { project_dir: query.project_dir })
		.await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let status = match &err {
			ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
			ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
			ServiceError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
			ServiceError::Provider { .. } => StatusCode::BAD_GATEWAY,
			ServiceError::Index { .. } => StatusCode::SERVICE_UNAVAILABLE,
		};
		let fields = match &err {
			ServiceError::Validation { field, .. } => Some(vec![field.clone()]),
			_ => None,
		};

		if status.is_server_error() {
			tracing::error!(error_code = err.code(), error = %err, "Request failed.");
		}

		Self::new(status, err.code(), err.to_string(), fields)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
