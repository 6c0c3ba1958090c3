use serde::{Deserialize, Serialize};

use crate::{Error, Operation, Result, TraceStore};
use ctxg_domain::{Outcome, TraceMetadata, limits};

const OPERATION: Operation = Operation::UpdateOutcome;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateOutcomeRequest {
	pub trace_id: String,
	pub outcome: String,
	#[serde(default)]
	pub project_dir: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateOutcomeResponse {
	pub trace_id: String,
	pub previous_outcome: Outcome,
	pub outcome: Outcome,
	pub project_dir: String,
}

impl TraceStore {
	/// Replaces a trace's outcome, leaving its text and embedding untouched.
	pub async fn update_outcome(&self, req: UpdateOutcomeRequest) -> Result<UpdateOutcomeResponse> {
		let invalid = |err| Error::domain(OPERATION, err);
		let trace_id = limits::required("trace_id", &req.trace_id).map_err(invalid)?;
		let outcome = req.outcome.parse::<Outcome>().map_err(invalid)?;
		let namespace = self.namespace(OPERATION, req.project_dir.as_deref()).await?;
		let _guard = namespace.write().await;
		let index = namespace.index();
		let Some(entry) =
			index.get(&trace_id).await.map_err(|err| Error::index(OPERATION, err))?
		else {
			return Err(Error::NotFound { trace_id });
		};
		let mut metadata =
			TraceMetadata::from_payload(&entry.metadata).map_err(|err| Error::Index {
				operation: OPERATION,
				message: format!("Stored trace {trace_id} is malformed: {err}"),
			})?;
		let previous_outcome = metadata.outcome;

		metadata.outcome = outcome;

		let payload = metadata.to_payload().map_err(invalid)?;
		let replaced = index
			.replace_metadata(&trace_id, payload)
			.await
			.map_err(|err| Error::index(OPERATION, err))?;

		if !replaced {
			return Err(Error::NotFound { trace_id });
		}

		tracing::info!(
			trace_id = %trace_id,
			namespace = namespace.name(),
			from = %previous_outcome,
			to = %outcome,
			"Updated trace outcome."
		);

		Ok(UpdateOutcomeResponse {
			trace_id,
			previous_outcome,
			outcome,
			project_dir: namespace.name().to_string(),
		})
	}
}
