use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Operation, Result, TraceStore};

const OPERATION: Operation = Operation::ListCategories;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListCategoriesRequest {
	#[serde(default)]
	pub project_dir: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListCategoriesResponse {
	pub project_dir: String,
	/// Keyed by category name, ascending.
	pub categories: BTreeMap<String, CategorySummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
	pub total: usize,
	/// Only outcomes that occur in the category.
	pub outcomes: BTreeMap<String, usize>,
}

impl TraceStore {
	pub async fn list_categories(
		&self,
		req: ListCategoriesRequest,
	) -> Result<ListCategoriesResponse> {
		let namespace = self.namespace(OPERATION, req.project_dir.as_deref()).await?;
		let records = {
			let _guard = namespace.read().await;

			namespace.index().scan_all().await.map_err(|err| Error::index(OPERATION, err))?
		};
		let mut categories = BTreeMap::<String, CategorySummary>::new();

		for record in records {
			let trace = crate::trace_from_record(OPERATION, record)?;
			let summary = categories.entry(trace.metadata.category).or_default();

			summary.total += 1;

			*summary.outcomes.entry(trace.metadata.outcome.as_str().to_string()).or_default() += 1;
		}

		Ok(ListCategoriesResponse { project_dir: namespace.name().to_string(), categories })
	}
}
