use serde_json::json;
use time::macros::datetime;

use ctxg_domain::{Outcome, Trace, TraceMetadata, id, limits};

#[test]
fn trace_serializes_flat() {
	let trace = Trace {
		id: id::trace_id("2026-05-01T10:00:00Z", "Chose FastAPI over Flask for async support"),
		decision: "Chose FastAPI over Flask for async support".to_string(),
		metadata: TraceMetadata {
			category: "framework".to_string(),
			outcome: Outcome::Pending,
			feature_id: None,
			timestamp: datetime!(2026-05-01 10:00:00 UTC),
			project_dir: "/work/api".to_string(),
		},
	};
	let value = serde_json::to_value(&trace).expect("Failed to serialize trace.");

	assert_eq!(
		value,
		json!({
			"id": trace.id,
			"decision": "Chose FastAPI over Flask for async support",
			"category": "framework",
			"outcome": "pending",
			"feature_id": null,
			"timestamp": "2026-05-01T10:00:00Z",
			"project_dir": "/work/api",
		})
	);
}

#[test]
fn decision_echo_is_capped() {
	let decision = "x".repeat(limits::DECISION_ECHO_CHARS + 1);
	let echo = limits::truncate_chars(&decision, limits::DECISION_ECHO_CHARS);

	assert_eq!(echo.chars().count(), limits::DECISION_ECHO_CHARS + 3);
	assert!(echo.ends_with("..."));
}
