use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
	#[default]
	Pending,
	Success,
	Failure,
}
impl Outcome {
	pub const ALL: [Self; 3] = [Self::Pending, Self::Success, Self::Failure];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}

impl fmt::Display for Outcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Outcome {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		let trimmed = raw.trim();

		Self::ALL.into_iter().find(|outcome| outcome.as_str() == trimmed).ok_or_else(|| {
			Error::validation(
				"outcome",
				format!("must be one of pending, success, or failure, got {trimmed:?}."),
			)
		})
	}
}

/// Everything stored alongside a trace's text and embedding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceMetadata {
	pub category: String,
	pub outcome: Outcome,
	pub feature_id: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	pub project_dir: String,
}
impl TraceMetadata {
	pub fn to_payload(&self) -> Result<Map<String, Value>> {
		match serde_json::to_value(self) {
			Ok(Value::Object(map)) => Ok(map),
			Ok(_) => Err(Error::InvalidRecord {
				message: "Trace metadata must serialize to an object.".to_string(),
			}),
			Err(err) => Err(Error::InvalidRecord { message: err.to_string() }),
		}
	}

	/// Reads metadata back from an index payload. Unknown keys are ignored.
	pub fn from_payload(payload: &Map<String, Value>) -> Result<Self> {
		serde_json::from_value(Value::Object(payload.clone()))
			.map_err(|err| Error::InvalidRecord { message: err.to_string() })
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
	pub id: String,
	pub decision: String,
	#[serde(flatten)]
	pub metadata: TraceMetadata,
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn sample_metadata() -> TraceMetadata {
		TraceMetadata {
			category: "framework".to_string(),
			outcome: Outcome::Success,
			feature_id: Some("feat-001".to_string()),
			timestamp: datetime!(2026-03-04 05:06:07.123456 UTC),
			project_dir: "/work/app".to_string(),
		}
	}

	#[test]
	fn outcome_parses_only_known_values() {
		assert_eq!("success".parse::<Outcome>().expect("valid"), Outcome::Success);
		assert_eq!(" failure ".parse::<Outcome>().expect("valid"), Outcome::Failure);

		let err = "done".parse::<Outcome>().expect_err("invalid outcome");

		assert!(matches!(err, Error::Validation { ref field, .. } if field == "outcome"));
	}

	#[test]
	fn outcome_defaults_to_pending() {
		assert_eq!(Outcome::default(), Outcome::Pending);
	}

	#[test]
	fn payload_keeps_metadata_fields() {
		let metadata = sample_metadata();
		let payload = metadata.to_payload().expect("payload");

		assert_eq!(payload.get("category"), Some(&Value::from("framework")));
		assert_eq!(payload.get("outcome"), Some(&Value::from("success")));
		assert_eq!(payload.get("timestamp"), Some(&Value::from("2026-03-04T05:06:07.123456Z")));
		assert_eq!(TraceMetadata::from_payload(&payload).expect("metadata"), metadata);
	}

	#[test]
	fn payload_with_unknown_outcome_is_rejected() {
		let mut payload = sample_metadata().to_payload().expect("payload");

		payload.insert("outcome".to_string(), Value::from("abandoned"));

		let err = TraceMetadata::from_payload(&payload).expect_err("invalid outcome");

		assert!(matches!(err, Error::InvalidRecord { .. }));
	}

	#[test]
	fn missing_feature_id_reads_as_none() {
		let mut payload = sample_metadata().to_payload().expect("payload");

		payload.remove("feature_id");

		assert_eq!(TraceMetadata::from_payload(&payload).expect("metadata").feature_id, None);
	}
}
