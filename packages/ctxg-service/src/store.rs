use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Error, Operation, Result, TraceStore};
use ctxg_domain::{Outcome, TraceMetadata, id, limits};
use ctxg_storage::IndexEntry;

const OPERATION: Operation = Operation::StoreTrace;
/// Identifier attempts before a store gives up on finding a free id.
const MAX_ID_ATTEMPTS: u32 = 8;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreTraceRequest {
	pub decision: String,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub outcome: Option<String>,
	#[serde(default)]
	pub feature_id: Option<String>,
	#[serde(default)]
	pub project_dir: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreTraceResponse {
	pub trace_id: String,
	#[serde(with = "ctxg_domain::time_serde")]
	pub timestamp: OffsetDateTime,
	pub category: String,
	/// The stored decision, cut to its first 200 characters.
	pub decision: String,
	pub outcome: Outcome,
	pub feature_id: Option<String>,
	pub project_dir: String,
}

struct ValidStore {
	decision: String,
	category: String,
	outcome: Outcome,
	feature_id: Option<String>,
}

impl TraceStore {
	pub async fn store_trace(&self, req: StoreTraceRequest) -> Result<StoreTraceResponse> {
		self.store_trace_at(req, OffsetDateTime::now_utc()).await
	}

	/// Stores a trace created at `now`. The timestamp is kept at microsecond precision and
	/// may advance by a few microseconds if the derived identifier is already taken.
	pub async fn store_trace_at(
		&self,
		req: StoreTraceRequest,
		now: OffsetDateTime,
	) -> Result<StoreTraceResponse> {
		let valid = validate(&req)?;
		let namespace = self.namespace(OPERATION, req.project_dir.as_deref()).await?;

		tracing::debug!(namespace = namespace.name(), "Generating decision embedding.");

		let vector = self.embed_one(OPERATION, &valid.decision).await?;

		tracing::debug!(namespace = namespace.name(), "Storing trace.");

		let _guard = namespace.write().await;
		let index = namespace.index();
		let mut timestamp = now.replace_microsecond(now.microsecond()).unwrap_or(now);
		let mut attempt = 1;
		let trace_id = loop {
			let formatted = timestamp.format(&Rfc3339).map_err(|err| Error::index(OPERATION, err))?;
			let candidate = id::trace_id(&formatted, &valid.decision);
			let taken = index
				.get(&candidate)
				.await
				.map_err(|err| Error::index(OPERATION, err))?
				.is_some();

			if !taken {
				break candidate;
			}
			if attempt == MAX_ID_ATTEMPTS {
				return Err(Error::Index {
					operation: OPERATION,
					message: format!(
						"No free trace identifier after {MAX_ID_ATTEMPTS} attempts; last tried {candidate}."
					),
				});
			}

			tracing::warn!(trace_id = %candidate, attempt, "Trace identifier collision; retrying.");

			timestamp += Duration::microseconds(1);
			attempt += 1;
		};
		let metadata = TraceMetadata {
			category: valid.category,
			outcome: valid.outcome,
			feature_id: valid.feature_id,
			timestamp,
			project_dir: namespace.name().to_string(),
		};
		let payload = metadata.to_payload().map_err(|err| Error::domain(OPERATION, err))?;

		index
			.insert(IndexEntry {
				id: trace_id.clone(),
				vector,
				text: valid.decision.clone(),
				metadata: payload,
			})
			.await
			.map_err(|err| Error::index(OPERATION, err))?;

		tracing::info!(
			trace_id = %trace_id,
			namespace = namespace.name(),
			category = %metadata.category,
			outcome = %metadata.outcome,
			"Stored trace."
		);

		Ok(StoreTraceResponse {
			trace_id,
			timestamp,
			category: metadata.category,
			decision: limits::truncate_chars(&valid.decision, limits::DECISION_ECHO_CHARS),
			outcome: metadata.outcome,
			feature_id: metadata.feature_id,
			project_dir: metadata.project_dir,
		})
	}
}

fn validate(req: &StoreTraceRequest) -> Result<ValidStore> {
	let invalid = |err| Error::domain(OPERATION, err);
	let decision =
		limits::text("decision", &req.decision, limits::DECISION_CHARS).map_err(invalid)?;
	let category = match req.category.as_deref() {
		Some(category) =>
			limits::text("category", category, limits::CATEGORY_CHARS).map_err(invalid)?,
		None => limits::DEFAULT_CATEGORY.to_string(),
	};
	let outcome = match req.outcome.as_deref() {
		Some(outcome) => outcome.parse::<Outcome>().map_err(invalid)?,
		None => Outcome::default(),
	};

	let feature_id = limits::optional_text(req.feature_id.as_deref());

	Ok(ValidStore { decision, category, outcome, feature_id })
}
