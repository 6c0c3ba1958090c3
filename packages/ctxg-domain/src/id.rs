//! Trace identifiers.
//!
//! An identifier is `trace_` followed by the first 12 hex digits of a blake3 digest over the
//! RFC 3339 creation timestamp and the decision text. Equal inputs yield equal identifiers, so
//! callers that need uniqueness must check for an existing entry before inserting.

pub const TRACE_ID_PREFIX: &str = "trace_";

const TRACE_ID_HEX_LEN: usize = 12;

pub fn trace_id(timestamp: &str, decision: &str) -> String {
	let mut hasher = blake3::Hasher::new();

	hasher.update(timestamp.as_bytes());
	hasher.update(decision.as_bytes());

	let hex = hasher.finalize().to_hex();

	format!("{TRACE_ID_PREFIX}{}", &hex.as_str()[..TRACE_ID_HEX_LEN])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identifier_has_prefix_and_fixed_width() {
		let id = trace_id("2026-01-01T00:00:00.000001Z", "Chose FastAPI over Flask");

		assert!(id.starts_with(TRACE_ID_PREFIX));
		assert_eq!(id.len(), TRACE_ID_PREFIX.len() + TRACE_ID_HEX_LEN);
		assert!(id[TRACE_ID_PREFIX.len()..].chars().all(|ch| ch.is_ascii_hexdigit()));
	}

	#[test]
	fn identical_inputs_collide() {
		let a = trace_id("2026-01-01T00:00:00Z", "Use Redis for caching");
		let b = trace_id("2026-01-01T00:00:00Z", "Use Redis for caching");

		assert_eq!(a, b);
	}

	#[test]
	fn timestamp_changes_identifier() {
		let a = trace_id("2026-01-01T00:00:00.000001Z", "Use Redis for caching");
		let b = trace_id("2026-01-01T00:00:00.000002Z", "Use Redis for caching");

		assert_ne!(a, b);
	}
}
