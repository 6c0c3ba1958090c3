use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::{Error, Operation, Result, TraceStore};
use ctxg_domain::{Outcome, Trace, limits};

const OPERATION: Operation = Operation::ListTraces;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListTracesRequest {
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub outcome: Option<String>,
	#[serde(default)]
	pub limit: Option<i64>,
	#[serde(default)]
	pub offset: Option<i64>,
	#[serde(default)]
	pub project_dir: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListTracesResponse {
	pub project_dir: String,
	pub category: Option<String>,
	pub outcome: Option<Outcome>,
	/// Matching traces before pagination.
	pub total: usize,
	pub count: usize,
	pub offset: usize,
	pub has_more: bool,
	pub next_offset: Option<usize>,
	/// Newest first.
	pub traces: Vec<Trace>,
}

impl TraceStore {
	pub async fn list_traces(&self, req: ListTracesRequest) -> Result<ListTracesResponse> {
		let invalid = |err| Error::domain(OPERATION, err);
		let limit = limits::number(
			"limit",
			req.limit.unwrap_or(i64::from(limits::DEFAULT_LIST_LIMIT)),
			limits::LIST_LIMIT,
		)
		.map_err(invalid)? as usize;
		let offset = limits::number("offset", req.offset.unwrap_or(0), limits::LIST_OFFSET)
			.map_err(invalid)? as usize;
		let category = limits::optional_text(req.category.as_deref());
		let outcome = match limits::optional_text(req.outcome.as_deref()) {
			Some(outcome) => Some(outcome.parse::<Outcome>().map_err(invalid)?),
			None => None,
		};
		let namespace = self.namespace(OPERATION, req.project_dir.as_deref()).await?;
		let records = {
			let _guard = namespace.read().await;

			namespace.index().scan_all().await.map_err(|err| Error::index(OPERATION, err))?
		};
		let mut traces = Vec::with_capacity(records.len());

		for record in records {
			let trace = crate::trace_from_record(OPERATION, record)?;

			if matches_filters(&trace, category.as_deref(), outcome) {
				traces.push(trace);
			}
		}

		traces.sort_by_key(|trace| Reverse(trace.metadata.timestamp));

		let page = paginate(traces, offset, limit);

		Ok(ListTracesResponse {
			project_dir: namespace.name().to_string(),
			category,
			outcome,
			total: page.total,
			count: page.items.len(),
			offset,
			has_more: page.next_offset.is_some(),
			next_offset: page.next_offset,
			traces: page.items,
		})
	}
}

struct Page<T> {
	items: Vec<T>,
	total: usize,
	next_offset: Option<usize>,
}

fn matches_filters(trace: &Trace, category: Option<&str>, outcome: Option<Outcome>) -> bool {
	category.is_none_or(|category| trace.metadata.category == category)
		&& outcome.is_none_or(|outcome| trace.metadata.outcome == outcome)
}

fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> Page<T> {
	let total = items.len();
	let items = items.into_iter().skip(offset).take(limit).collect::<Vec<_>>();
	let end = offset.saturating_add(items.len());
	let next_offset = (end < total).then_some(end);

	Page { items, total, next_offset }
}
