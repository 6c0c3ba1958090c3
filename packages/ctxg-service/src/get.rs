use serde::{Deserialize, Serialize};

use crate::{Error, Operation, Result, TraceStore};
use ctxg_domain::{Trace, limits};
use ctxg_storage::IndexRecord;

const OPERATION: Operation = Operation::GetTrace;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GetTraceRequest {
	pub trace_id: String,
	#[serde(default)]
	pub project_dir: Option<String>,
}

impl TraceStore {
	/// Returns the stored text and metadata. The embedding is never returned.
	pub async fn get_trace(&self, req: GetTraceRequest) -> Result<Trace> {
		let trace_id = limits::required("trace_id", &req.trace_id)
			.map_err(|err| Error::domain(OPERATION, err))?;
		let namespace = self.namespace(OPERATION, req.project_dir.as_deref()).await?;
		let entry = {
			let _guard = namespace.read().await;

			namespace.index().get(&trace_id).await.map_err(|err| Error::index(OPERATION, err))?
		};
		let Some(entry) = entry else { return Err(Error::NotFound { trace_id }) };

		crate::trace_from_record(
			OPERATION,
			IndexRecord { id: entry.id, text: entry.text, metadata: entry.metadata },
		)
	}
}
