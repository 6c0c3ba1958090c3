//! Markdown and JSON renderings of trace store results.
//!
//! Both renderings carry the same data; markdown is meant for people reading tool output and
//! JSON for programs.

use std::str::FromStr;

use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use ctxg_domain::{Trace, limits};
use ctxg_service::{
	ListCategoriesResponse, ListTracesResponse, QueryTracesResponse, StoreTraceResponse,
	UpdateOutcomeResponse,
};

const QUERY_HEADING_CHARS: usize = 100;
const HIT_DECISION_CHARS: usize = 100;
const LIST_HEADING_CHARS: usize = 80;
const LIST_DECISION_CHARS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
	Markdown,
	Json,
}
impl FromStr for ResponseFormat {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"markdown" => Ok(Self::Markdown),
			"json" => Ok(Self::Json),
			other => Err(format!("response_format must be markdown or json, got {other:?}.")),
		}
	}
}

pub fn store_json(resp: &StoreTraceResponse) -> Value {
	json!({
		"trace_id": resp.trace_id,
		"timestamp": rfc3339(resp.timestamp),
		"category": resp.category,
		"decision": resp.decision,
		"outcome": resp.outcome.as_str(),
		"feature_id": resp.feature_id,
		"project_dir": resp.project_dir,
	})
}

pub fn store_markdown(resp: &StoreTraceResponse) -> String {
	let mut lines = vec![
		"# Trace Stored".to_string(),
		String::new(),
		format!("- **ID**: `{}`", resp.trace_id),
		format!("- **Category**: {}", resp.category),
		format!("- **Outcome**: {}", resp.outcome),
		format!("- **Timestamp**: {}", rfc3339(resp.timestamp)),
	];

	if let Some(feature_id) = &resp.feature_id {
		lines.push(format!("- **Feature**: {feature_id}"));
	}

	lines.push(String::new());
	lines.push(format!("> {}", resp.decision));

	lines.join("\n")
}

pub fn query_json(resp: &QueryTracesResponse) -> Value {
	let results = resp
		.hits
		.iter()
		.map(|hit| {
			json!({
				"rank": hit.rank,
				"similarity": hit.similarity,
				"id": hit.trace.id,
				"category": hit.trace.metadata.category,
				"decision": hit.trace.decision,
				"outcome": hit.trace.metadata.outcome.as_str(),
				"feature_id": hit.trace.metadata.feature_id,
				"timestamp": rfc3339(hit.trace.metadata.timestamp),
			})
		})
		.collect::<Vec<_>>();
	let mut body = json!({
		"query": resp.query,
		"total": results.len(),
		"results": results,
	});

	if resp.store_empty {
		body["message"] = Value::from("No traces stored yet.");
	} else if resp.hits.is_empty() {
		body["message"] = Value::from("No traces match your search.");
	}

	body
}

pub fn query_markdown(resp: &QueryTracesResponse) -> String {
	if resp.store_empty {
		return "# No traces found\n\nStore decisions first to enable semantic search.".to_string();
	}
	if resp.hits.is_empty() {
		return format!(
			"# No similar traces found\n\nQuery: '{}'\n\nNo traces match your search.",
			resp.query
		);
	}

	let mut lines = vec![
		format!("# Similar Traces for: \"{}\"", head(&resp.query, QUERY_HEADING_CHARS)),
		String::new(),
		format!("Found {} similar trace(s)", resp.hits.len()),
		String::new(),
	];

	for hit in &resp.hits {
		let similarity = match hit.similarity {
			Some(similarity) => format!("{:.0}%", similarity * 100.0),
			None => "N/A".to_string(),
		};

		lines.push(format!(
			"## {}. {} ({similarity} similar)",
			hit.rank,
			limits::truncate_chars(&hit.trace.decision, HIT_DECISION_CHARS)
		));
		lines.push(format!("- **ID**: `{}`", hit.trace.id));
		lines.push(format!("- **Category**: {}", hit.trace.metadata.category));
		lines.push(format!("- **Outcome**: {}", hit.trace.metadata.outcome));

		if let Some(feature_id) = &hit.trace.metadata.feature_id {
			lines.push(format!("- **Feature**: {feature_id}"));
		}

		lines.push(String::new());
	}

	lines.join("\n")
}

pub fn trace_json(trace: &Trace) -> Value {
	json!({
		"id": trace.id,
		"timestamp": rfc3339(trace.metadata.timestamp),
		"category": trace.metadata.category,
		"decision": trace.decision,
		"outcome": trace.metadata.outcome.as_str(),
		"feature_id": trace.metadata.feature_id,
		"project_dir": trace.metadata.project_dir,
	})
}

pub fn trace_markdown(trace: &Trace) -> String {
	let mut lines = vec![
		format!("# Trace: {}", trace.id),
		String::new(),
		format!("**Decision**: {}", trace.decision),
		format!("**Category**: {}", trace.metadata.category),
		format!("**Outcome**: {}", trace.metadata.outcome),
		format!("**Timestamp**: {}", rfc3339(trace.metadata.timestamp)),
		String::new(),
	];

	if let Some(feature_id) = &trace.metadata.feature_id {
		lines.push(format!("**Feature**: {feature_id}"));
	}
	if !trace.metadata.project_dir.is_empty() {
		lines.push(format!("**Project**: {}", trace.metadata.project_dir));
	}

	lines.push(String::new());

	lines.join("\n")
}

pub fn update_json(resp: &UpdateOutcomeResponse) -> Value {
	json!({
		"trace_id": resp.trace_id,
		"previous_outcome": resp.previous_outcome.as_str(),
		"outcome": resp.outcome.as_str(),
		"updated": true,
	})
}

pub fn update_markdown(resp: &UpdateOutcomeResponse) -> String {
	format!(
		"# Outcome Updated\n\n- **ID**: `{}`\n- **Outcome**: {} -> {}",
		resp.trace_id, resp.previous_outcome, resp.outcome
	)
}

pub fn list_json(resp: &ListTracesResponse) -> Value {
	let traces = resp
		.traces
		.iter()
		.map(|trace| {
			json!({
				"id": trace.id,
				"timestamp": rfc3339(trace.metadata.timestamp),
				"category": trace.metadata.category,
				"decision": limits::truncate_chars(&trace.decision, LIST_DECISION_CHARS),
				"outcome": trace.metadata.outcome.as_str(),
				"feature_id": trace.metadata.feature_id,
			})
		})
		.collect::<Vec<_>>();

	json!({
		"total": resp.total,
		"count": resp.count,
		"offset": resp.offset,
		"has_more": resp.has_more,
		"next_offset": resp.next_offset,
		"traces": traces,
	})
}

pub fn list_markdown(resp: &ListTracesResponse) -> String {
	if resp.total == 0 && resp.category.is_none() && resp.outcome.is_none() {
		return "No traces found. Store a trace first.".to_string();
	}

	let mut lines = vec![
		"# Decision Traces".to_string(),
		String::new(),
		format!("**Total**: {} | **Showing**: {} (offset {})", resp.total, resp.count, resp.offset),
		String::new(),
	];

	if let Some(category) = &resp.category {
		lines.push(format!("**Filter**: category='{category}'"));
	}
	if let Some(outcome) = resp.outcome {
		lines.push(format!("**Filter**: outcome='{outcome}'"));
	}

	lines.push(String::new());

	for trace in &resp.traces {
		lines.push(format!("## {}", limits::truncate_chars(&trace.decision, LIST_HEADING_CHARS)));
		lines.push(format!("- **ID**: `{}`", trace.id));
		lines.push(format!(
			"- **Category**: {} | **Outcome**: {}",
			trace.metadata.category, trace.metadata.outcome
		));
		lines.push(format!("- **When**: {}", rfc3339(trace.metadata.timestamp)));
		lines.push(String::new());
	}

	if let Some(next_offset) = resp.next_offset {
		lines.push(format!("*More traces available (use offset={next_offset})*"));
	}

	lines.join("\n")
}

pub fn categories_json(resp: &ListCategoriesResponse) -> Value {
	json!({ "categories": resp.categories })
}

pub fn categories_markdown(resp: &ListCategoriesResponse) -> String {
	if resp.categories.is_empty() {
		return "# No categories found\n\nStore traces to populate categories.".to_string();
	}

	let mut lines = vec!["# Trace Categories".to_string(), String::new()];

	for (category, summary) in &resp.categories {
		lines.push(format!("## {category}"));
		lines.push(format!("**Total**: {}", summary.total));

		for (outcome, count) in &summary.outcomes {
			lines.push(format!("- {outcome}: {count}"));
		}

		lines.push(String::new());
	}

	lines.join("\n")
}

fn rfc3339(timestamp: OffsetDateTime) -> String {
	timestamp.format(&Rfc3339).unwrap_or_else(|_| timestamp.to_string())
}

fn head(text: &str, max: usize) -> &str {
	match text.char_indices().nth(max) {
		Some((byte_idx, _)) => &text[..byte_idx],
		None => text,
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use time::macros::datetime;

	use super::*;
	use ctxg_domain::{Outcome, TraceMetadata};
	use ctxg_service::{CategorySummary, QueryHit};

	fn trace(id: &str, decision: &str, outcome: Outcome) -> Trace {
		Trace {
			id: id.to_string(),
			decision: decision.to_string(),
			metadata: TraceMetadata {
				category: "framework".to_string(),
				outcome,
				feature_id: None,
				timestamp: datetime!(2026-02-03 04:05:06 UTC),
				project_dir: "/work/app".to_string(),
			},
		}
	}

	fn query_response(hits: Vec<QueryHit>, store_empty: bool) -> QueryTracesResponse {
		QueryTracesResponse {
			query: "web framework selection".to_string(),
			project_dir: "/work/app".to_string(),
			store_empty,
			hits,
		}
	}

	#[test]
	fn response_format_parses_case_insensitively() {
		assert_eq!("JSON".parse::<ResponseFormat>(), Ok(ResponseFormat::Json));
		assert_eq!(" markdown ".parse::<ResponseFormat>(), Ok(ResponseFormat::Markdown));
		assert!("yaml".parse::<ResponseFormat>().is_err());
	}

	#[test]
	fn query_markdown_distinguishes_empty_store_from_no_match() {
		let empty_store = query_markdown(&query_response(Vec::new(), true));
		let no_match = query_markdown(&query_response(Vec::new(), false));

		assert!(empty_store.starts_with("# No traces found"));
		assert!(no_match.starts_with("# No similar traces found"));
		assert!(no_match.contains("web framework selection"));
	}

	#[test]
	fn query_markdown_shows_percentage_or_na() {
		let hits = vec![
			QueryHit {
				rank: 1,
				similarity: Some(0.5),
				trace: trace("trace_aaaaaaaaaaaa", "Chose FastAPI over Flask", Outcome::Success),
			},
			QueryHit {
				rank: 2,
				similarity: None,
				trace: trace("trace_bbbbbbbbbbbb", "Chose Axum over Actix", Outcome::Pending),
			},
		];
		let markdown = query_markdown(&query_response(hits, false));

		assert!(markdown.contains("# Similar Traces for: \"web framework selection\""));
		assert!(markdown.contains("Found 2 similar trace(s)"));
		assert!(markdown.contains("## 1. Chose FastAPI over Flask (50% similar)"));
		assert!(markdown.contains("## 2. Chose Axum over Actix (N/A similar)"));
		assert!(markdown.contains("- **ID**: `trace_aaaaaaaaaaaa`"));
	}

	#[test]
	fn query_json_explains_empty_results() {
		let empty_store = query_json(&query_response(Vec::new(), true));
		let no_match = query_json(&query_response(Vec::new(), false));

		assert_eq!(empty_store["message"], "No traces stored yet.");
		assert_eq!(no_match["total"], 0);
		assert_eq!(no_match["message"], "No traces match your search.");
	}

	#[test]
	fn query_json_keeps_absent_similarity_as_null() {
		let hits = vec![QueryHit {
			rank: 1,
			similarity: None,
			trace: trace("trace_aaaaaaaaaaaa", "Chose FastAPI over Flask", Outcome::Success),
		}];
		let body = query_json(&query_response(hits, false));

		assert_eq!(body["total"], 1);
		assert_eq!(body.get("message"), None);
		assert_eq!(body["results"][0]["similarity"], Value::Null);
		assert_eq!(body["results"][0]["outcome"], "success");
		assert_eq!(body["results"][0]["timestamp"], "2026-02-03T04:05:06Z");
	}

	#[test]
	fn list_markdown_points_at_next_offset() {
		let resp = ListTracesResponse {
			project_dir: "/work/app".to_string(),
			category: Some("framework".to_string()),
			outcome: None,
			total: 3,
			count: 1,
			offset: 0,
			has_more: true,
			next_offset: Some(1),
			traces: vec![trace("trace_aaaaaaaaaaaa", &"d".repeat(90), Outcome::Pending)],
		};
		let markdown = list_markdown(&resp);

		assert!(markdown.contains("**Total**: 3 | **Showing**: 1 (offset 0)"));
		assert!(markdown.contains("**Filter**: category='framework'"));
		assert!(markdown.contains(&format!("## {}...", "d".repeat(80))));
		assert!(markdown.ends_with("*More traces available (use offset=1)*"));
	}

	#[test]
	fn list_json_truncates_decisions() {
		let resp = ListTracesResponse {
			project_dir: "/work/app".to_string(),
			category: None,
			outcome: None,
			total: 1,
			count: 1,
			offset: 0,
			has_more: false,
			next_offset: None,
			traces: vec![trace("trace_aaaaaaaaaaaa", &"d".repeat(150), Outcome::Pending)],
		};
		let body = list_json(&resp);

		assert_eq!(body["next_offset"], Value::Null);
		assert_eq!(body["traces"][0]["decision"].as_str().map(|text| text.len()), Some(103));
	}

	#[test]
	fn categories_render_sorted_tallies() {
		let mut outcomes = BTreeMap::new();

		outcomes.insert("failure".to_string(), 1);
		outcomes.insert("success".to_string(), 2);

		let mut categories = BTreeMap::new();

		categories.insert("architecture".to_string(), CategorySummary { total: 3, outcomes });

		let resp = ListCategoriesResponse { project_dir: "/work/app".to_string(), categories };
		let markdown = categories_markdown(&resp);

		assert_eq!(
			markdown,
			"# Trace Categories\n\n## architecture\n**Total**: 3\n- failure: 1\n- success: 2\n"
		);
		assert_eq!(categories_json(&resp)["categories"]["architecture"]["outcomes"]["success"], 2);
	}

	#[test]
	fn empty_categories_have_a_message() {
		let resp = ListCategoriesResponse {
			project_dir: "/work/app".to_string(),
			categories: BTreeMap::new(),
		};

		assert!(categories_markdown(&resp).starts_with("# No categories found"));
	}
}
