use serde::{Deserialize, Serialize};

use crate::{Error, Operation, Result, TraceStore};
use ctxg_domain::{Outcome, Trace, limits, similarity};
use ctxg_storage::MetadataFilter;

const OPERATION: Operation = Operation::QueryTraces;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryTracesRequest {
	pub query: String,
	#[serde(default)]
	pub limit: Option<i64>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub outcome: Option<String>,
	#[serde(default)]
	pub project_dir: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryTracesResponse {
	pub query: String,
	pub project_dir: String,
	/// `true` when the namespace held no traces at all, as opposed to none matching.
	pub store_empty: bool,
	pub hits: Vec<QueryHit>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryHit {
	/// 1-based position in index order.
	pub rank: usize,
	/// `1 / (1 + distance)` rounded to three places; absent when the index gave no distance.
	pub similarity: Option<f64>,
	pub trace: Trace,
}

impl TraceStore {
	pub async fn query_traces(&self, req: QueryTracesRequest) -> Result<QueryTracesResponse> {
		let invalid = |err| Error::domain(OPERATION, err);
		let query = limits::text("query", &req.query, limits::QUERY_CHARS).map_err(invalid)?;
		let limit = limits::number(
			"limit",
			req.limit.unwrap_or(i64::from(limits::DEFAULT_QUERY_LIMIT)),
			limits::QUERY_LIMIT,
		)
		.map_err(invalid)?;
		let category = limits::optional_text(req.category.as_deref());
		let outcome = match limits::optional_text(req.outcome.as_deref()) {
			Some(outcome) => Some(outcome.parse::<Outcome>().map_err(invalid)?),
			None => None,
		};
		let namespace = self.namespace(OPERATION, req.project_dir.as_deref()).await?;
		let count = {
			let _guard = namespace.read().await;

			namespace.index().count().await.map_err(|err| Error::index(OPERATION, err))?
		};

		if count == 0 {
			return Ok(QueryTracesResponse {
				query,
				project_dir: namespace.name().to_string(),
				store_empty: true,
				hits: Vec::new(),
			});
		}

		let vector = self.embed_one(OPERATION, &query).await?;
		let mut filter = MetadataFilter::new();

		if let Some(category) = category {
			filter = filter.eq("category", category);
		}
		if let Some(outcome) = outcome {
			filter = filter.eq("outcome", outcome.as_str());
		}

		let raw_hits = {
			let _guard = namespace.read().await;

			namespace
				.index()
				.knn(&vector, u64::from(limit), &filter)
				.await
				.map_err(|err| Error::index(OPERATION, err))?
		};
		let mut hits = Vec::with_capacity(raw_hits.len());

		for (idx, hit) in raw_hits.into_iter().enumerate() {
			let similarity = similarity::from_distance(hit.distance).map(similarity::round3);
			let trace = crate::trace_from_record(
				OPERATION,
				ctxg_storage::IndexRecord { id: hit.id, text: hit.text, metadata: hit.metadata },
			)?;

			hits.push(QueryHit { rank: idx + 1, similarity, trace });
		}

		tracing::info!(namespace = namespace.name(), hits = hits.len(), "Queried traces.");

		Ok(QueryTracesResponse {
			query,
			project_dir: namespace.name().to_string(),
			store_empty: false,
			hits,
		})
	}
}
